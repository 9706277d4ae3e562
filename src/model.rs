//! Model identifiers and sampling parameters.

use std::fmt;

/// A completion model.
///
/// The named variants are the shortcuts `App` exposes as methods; any other
/// identifier goes through [`Model::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// `gpt-3.5-turbo-1106`, 16,385 token context.
    Gpt35Turbo,
    /// `gpt-3.5`.
    Gpt35,
    /// `gpt-4-1106-preview`, 128,000 token context.
    Gpt4Turbo,
    /// `gpt-4`, 8,000 token context.
    Gpt4,
    /// Any other model identifier.
    Custom(String),
}

impl Model {
    /// Identifier sent to the service.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Model::Gpt35Turbo => "gpt-3.5-turbo-1106",
            Model::Gpt35 => "gpt-3.5",
            Model::Gpt4Turbo => "gpt-4-1106-preview",
            Model::Gpt4 => "gpt-4",
            Model::Custom(id) => id,
        }
    }

    /// Preview models accept a JSON-object response format.
    #[must_use]
    pub fn supports_json_mode(&self) -> bool {
        self.id().ends_with("preview")
    }
}

impl From<&str> for Model {
    fn from(id: &str) -> Self {
        match id {
            "gpt-3.5-turbo-1106" => Model::Gpt35Turbo,
            "gpt-3.5" => Model::Gpt35,
            "gpt-4-1106-preview" => Model::Gpt4Turbo,
            "gpt-4" => Model::Gpt4,
            other => Model::Custom(other.to_string()),
        }
    }
}

impl From<String> for Model {
    fn from(id: String) -> Self {
        Model::from(id.as_str())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Sampling parameters for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus-sampling probability mass.
    pub top_p: f32,
    /// Penalty for frequently repeated tokens.
    pub frequency_penalty: f32,
    /// Penalty for tokens already present.
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self { temperature: 0.5, top_p: 0.5, frequency_penalty: 0.0, presence_penalty: 0.0 }
    }
}

impl SamplingParams {
    /// Returns a copy with `temperature` replaced.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns a copy with `top_p` replaced.
    #[must_use]
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Returns a copy with `frequency_penalty` replaced.
    #[must_use]
    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.frequency_penalty = penalty;
        self
    }

    /// Returns a copy with `presence_penalty` replaced.
    #[must_use]
    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.presence_penalty = penalty;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_map_to_shortcuts() {
        assert_eq!(Model::from("gpt-4"), Model::Gpt4);
        assert_eq!(Model::from("gpt-4-1106-preview"), Model::Gpt4Turbo);
        assert_eq!(Model::from("gpt-4o".to_string()), Model::Custom("gpt-4o".into()));
        assert_eq!(Model::Gpt35Turbo.to_string(), "gpt-3.5-turbo-1106");
    }

    #[test]
    fn json_mode_only_for_preview_models() {
        assert!(Model::Gpt4Turbo.supports_json_mode());
        assert!(Model::Custom("gpt-4-vision-preview".into()).supports_json_mode());
        assert!(!Model::Gpt4.supports_json_mode());
        assert!(!Model::Custom("preview-gpt".into()).supports_json_mode());
    }

    #[test]
    fn sampling_defaults_and_overrides() {
        let params = SamplingParams::default().temperature(0.2).presence_penalty(0.1);
        assert_eq!(params.temperature, 0.2);
        assert_eq!(params.top_p, 0.5);
        assert_eq!(params.frequency_penalty, 0.0);
        assert_eq!(params.presence_penalty, 0.1);
    }
}
