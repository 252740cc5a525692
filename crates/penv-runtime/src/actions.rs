//! Default actions
//!
//! What `submit` on a form and `click` on a link or submit button do when no
//! listener prevented the default.

use penv_dom::NodeId;
use penv_dom::events::{CallbackError, DomEventType, Event};
use penv_net::{Method, Request};
use url::form_urlencoded;

use crate::Window;

/// Input types whose value is never submitted
const UNSUBMITTED_INPUTS: &[&str] = &["submit", "button", "reset", "image", "file"];

impl Window {
    pub(crate) fn install_default_actions(&mut self) {
        self.set_default_action(DomEventType::Submit.as_str(), submit_default);
        self.set_default_action(DomEventType::Click.as_str(), click_default);
    }

    /// Name/value pairs of the successful controls of `form`, in tree order
    pub fn form_data(&self, form: NodeId) -> Vec<(String, String)> {
        let mut data = Vec::new();
        for node in self.dom.descendants(form) {
            let Some(tag) = self.html_tag(node) else {
                continue;
            };
            let Some(name) = self.dom.get_attribute(node, "name") else {
                continue;
            };
            if name.is_empty() || self.dom.has_attribute(node, "disabled") {
                continue;
            }
            match tag.as_str() {
                "input" => {
                    let ty = self
                        .dom
                        .get_attribute(node, "type")
                        .unwrap_or_default()
                        .to_ascii_lowercase();
                    if UNSUBMITTED_INPUTS.contains(&ty.as_str()) {
                        continue;
                    }
                    if ty == "checkbox" || ty == "radio" {
                        if !self.dom.has_attribute(node, "checked") {
                            continue;
                        }
                        let value = self
                            .dom
                            .get_attribute(node, "value")
                            .unwrap_or_else(|| "on".into());
                        data.push((name, value));
                    } else {
                        data.push((name, self.dom.get_attribute(node, "value").unwrap_or_default()));
                    }
                }
                "select" => {
                    if let Some(value) = self.selected_value(node) {
                        data.push((name, value));
                    }
                }
                "textarea" => {
                    let text = self.dom.text_content(node).ok().flatten().unwrap_or_default();
                    data.push((name, text));
                }
                _ => {}
            }
        }
        data
    }

    fn selected_value(&self, select: NodeId) -> Option<String> {
        let options: Vec<NodeId> = self
            .dom
            .descendants(select)
            .into_iter()
            .filter(|&n| self.html_tag(n).as_deref() == Some("option"))
            .collect();
        let chosen = options
            .iter()
            .copied()
            .find(|&o| self.dom.has_attribute(o, "selected"))
            .or_else(|| options.first().copied())?;
        self.dom.get_attribute(chosen, "value").or_else(|| {
            self.dom
                .text_content(chosen)
                .ok()
                .flatten()
                .map(|t| t.trim().to_string())
        })
    }

    /// Navigate with the form's data: GET puts it in the query, POST in the body
    pub fn submit_form(&mut self, form: NodeId) -> crate::RuntimeResult<()> {
        let action = self.dom.get_attribute(form, "action").unwrap_or_default();
        let action = if action.is_empty() {
            self.location.href().to_string()
        } else {
            self.resolve_url(&action)?
        };
        if action.is_empty() {
            return Ok(());
        }
        let method = self
            .dom
            .get_attribute(form, "method")
            .and_then(|m| Method::parse(&m))
            .unwrap_or(Method::Get);
        let pairs = self.form_data(form);
        tracing::info!("Submitting form {} to {}", form, action);

        let request = if method == Method::Post {
            let body = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&pairs)
                .finish();
            Request::post(&action)
                .with_header("Content-Type", "application/x-www-form-urlencoded")
                .with_body(body.into_bytes())
        } else {
            let mut url = penv_net::Url::parse(&action)
                .map_err(|e| penv_net::NetError::InvalidUrl(format!("{}: {}", action, e)))?;
            url.set_fragment(None);
            url.query_pairs_mut().clear().extend_pairs(&pairs);
            Request::get(url.as_str())
        };
        self.load_document(request)
    }

    /// Nearest ancestor-or-self element with the given HTML tag
    fn closest(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        std::iter::once(node)
            .chain(self.dom.ancestors(node))
            .find(|&n| self.html_tag(n).as_deref() == Some(tag))
    }
}

fn submit_default(window: &mut Window, event: &Event) -> Result<(), CallbackError> {
    let Some(form) = event.target.and_then(|t| t.node()) else {
        return Ok(());
    };
    if window.html_tag(form).as_deref() != Some("form") {
        return Ok(());
    }
    window.submit_form(form)?;
    Ok(())
}

fn click_default(window: &mut Window, event: &Event) -> Result<(), CallbackError> {
    let Some(target) = event.target.and_then(|t| t.node()) else {
        return Ok(());
    };

    if let Some(link) = window.closest(target, "a") {
        if let Some(href) = window.dom.get_attribute(link, "href") {
            window.assign(&href)?;
            return Ok(());
        }
    }

    let is_submit = match window.html_tag(target).as_deref() {
        Some("input") => window
            .dom
            .get_attribute(target, "type")
            .is_some_and(|t| t.eq_ignore_ascii_case("submit") || t.eq_ignore_ascii_case("image")),
        Some("button") => window
            .dom
            .get_attribute(target, "type")
            .is_none_or(|t| t.eq_ignore_ascii_case("submit")),
        _ => false,
    };
    if !is_submit {
        return Ok(());
    }
    if let Some(form) = window.closest(target, "form") {
        let mut submit = Event::new(DomEventType::Submit, true, true);
        window.dispatch_event(form, &mut submit)?;
    }
    Ok(())
}
