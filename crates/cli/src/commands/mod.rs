pub mod ask;
pub mod config;
pub mod doctor;

use serde::Serialize;

pub const EXIT_OK: u8 = 0;
pub const EXIT_INTERNAL: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_REQUEST: u8 = 3;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Prints `value` as pretty JSON. A value that cannot be serialized
    /// becomes a failure payload with [`EXIT_INTERNAL`].
    pub fn json<T: Serialize>(command: &str, value: &T, exit_code: u8) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(output) => Self { exit_code, output },
            Err(error) => {
                Self::failure(command, "serialization", error.to_string(), EXIT_INTERNAL)
            }
        }
    }
}

fn serialize_payload(payload: &CommandOutcome) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use serde::{Serialize, Serializer};
    use serde_json::Value;

    use super::{CommandResult, EXIT_INTERNAL, EXIT_OK};

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(<S::Error as serde::ser::Error>::custom("refusing to serialize"))
        }
    }

    #[test]
    fn serialization_failure_is_never_a_success_exit() {
        let result = CommandResult::json("ask", &Unserializable, EXIT_OK);
        assert_eq!(result.exit_code, EXIT_INTERNAL);

        let payload: Value = serde_json::from_str(&result.output).expect("failure payload is JSON");
        assert_eq!(payload["command"], "ask");
        assert_eq!(payload["error_class"], "serialization");
        assert!(payload["message"].as_str().is_some_and(|message| message.contains("refusing")));
    }
}
