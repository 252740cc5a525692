//! penv Runtime
//!
//! The window environment: a DOM document with listeners, the cooperative
//! timer loop, element load behaviours, navigation and XMLHttpRequest.

mod actions;
mod clock;
mod config;
mod console;
mod error;
mod loader;
mod location;
mod parser;
mod timers;
mod window;
mod xhr;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, DEFAULT_USER_AGENT};
pub use console::{Console, ConsoleLevel};
pub use error::{RuntimeError, RuntimeResult, XhrError};
pub use location::{History, Location};
pub use parser::{Html5everParser, HtmlParser, ScriptEvaluator};
pub use timers::{Scheduler, TimerCallback, TimerContext, wait};
pub use window::{DefaultAction, InsertHook, Window, WindowBuilder};
pub use xhr::{XhrCallback, XhrHandle, XhrReadyState, XmlHttpRequest};
