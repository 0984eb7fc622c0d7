// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use tracing::warn;

use crate::message::Message;
use crate::outputs::MessageOutput;
use crate::pipeline::MessageConsumer;

/// Fans each message out to every matching output.
///
/// Matching is an inclusive union: an output takes a message when the
/// message names the output explicitly, when the output accepts the
/// message's input, or when neither side states a preference. A message can
/// reach several outputs, and a message nothing matches is dropped silently.
pub struct OutputRouter {
    outputs: Vec<Arc<dyn MessageOutput>>,
}

impl OutputRouter {
    pub fn new(outputs: Vec<Arc<dyn MessageOutput>>) -> Self {
        Self { outputs }
    }

    fn matches(output: &dyn MessageOutput, message: &Message) -> bool {
        if message.outputs().contains(output.id()) {
            return true;
        }
        if let Some(allowed) = output.allowed_inputs() {
            if allowed.contains(message.input_id()) {
                return true;
            }
            if !allowed.is_empty() {
                return false;
            }
        }
        // Unrestricted output, undirected message
        message.outputs().is_empty()
    }

    pub fn route(&self, message: &Message) {
        for output in &self.outputs {
            if Self::matches(output.as_ref(), message) {
                if let Err(e) = output.write(message) {
                    warn!(output = output.id(), error = %e, "output write failed");
                }
            }
        }
    }
}

impl MessageConsumer for OutputRouter {
    fn process(&self, message: &Message) {
        self.route(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageBuilder;
    use crate::outputs::OutputError;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct Recording {
        id: String,
        allowed: Option<HashSet<String>>,
        seen: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(id: &str, allowed: Option<&[&str]>) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                allowed: allowed.map(|ids| ids.iter().map(|s| s.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl MessageOutput for Recording {
        fn id(&self) -> &str {
            &self.id
        }

        fn allowed_inputs(&self) -> Option<&HashSet<String>> {
            self.allowed.as_ref()
        }

        fn write(&self, message: &Message) -> Result<(), OutputError> {
            self.seen.lock().unwrap().push(message.text().to_string());
            Ok(())
        }
    }

    fn message(text: &str, input_id: &str, outputs: &[&str]) -> Message {
        let mut builder = MessageBuilder::new();
        builder.text(text).unwrap();
        builder.source("test").unwrap();
        builder.timestamp(Utc::now()).unwrap();
        builder.input_id(input_id).unwrap();
        builder
            .outputs(outputs.iter().map(|s| s.to_string()).collect())
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn undirected_message_reaches_unrestricted_outputs_only() {
        let open = Recording::new("open", None);
        let restricted = Recording::new("picky", Some(&["other-input"]));
        let router = OutputRouter::new(vec![open.clone(), restricted.clone()]);

        router.route(&message("hello", "app", &[]));

        assert_eq!(vec!["hello".to_string()], open.seen());
        assert!(restricted.seen().is_empty());
    }

    #[test]
    fn message_named_output_wins_over_restriction() {
        let restricted = Recording::new("audit", Some(&["other-input"]));
        let router = OutputRouter::new(vec![restricted.clone()]);

        // The restriction doesn't cover this input, but the message names
        // the output explicitly
        router.route(&message("direct", "app", &["audit"]));
        assert_eq!(vec!["direct".to_string()], restricted.seen());
    }

    #[test]
    fn restricted_output_accepts_allowed_input() {
        let restricted = Recording::new("audit", Some(&["app"]));
        let router = OutputRouter::new(vec![restricted.clone()]);

        router.route(&message("from app", "app", &[]));
        router.route(&message("from other", "other", &[]));

        assert_eq!(vec!["from app".to_string()], restricted.seen());
    }

    #[test]
    fn directed_message_skips_unnamed_unrestricted_outputs() {
        let open = Recording::new("stdout", None);
        let named = Recording::new("audit", None);
        let router = OutputRouter::new(vec![open.clone(), named.clone()]);

        router.route(&message("for audit", "app", &["audit"]));

        assert!(open.seen().is_empty());
        assert_eq!(vec!["for audit".to_string()], named.seen());
    }

    #[test]
    fn message_can_reach_multiple_outputs() {
        let a = Recording::new("a", None);
        let b = Recording::new("b", None);
        let router = OutputRouter::new(vec![a.clone(), b.clone()]);

        router.route(&message("broadcast", "app", &["a", "b"]));

        assert_eq!(vec!["broadcast".to_string()], a.seen());
        assert_eq!(vec!["broadcast".to_string()], b.seen());
    }

    #[test]
    fn empty_allowed_set_behaves_as_unrestricted() {
        let output = Recording::new("open", Some(&[]));
        let router = OutputRouter::new(vec![output.clone()]);

        router.route(&message("hello", "app", &[]));
        assert_eq!(vec!["hello".to_string()], output.seen());
    }
}
