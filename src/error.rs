pub type MicamlResult<T> = Result<T, MicamlError>;

#[derive(thiserror::Error, Debug)]
pub enum MicamlError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("animation error: {0}")]
    Animation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MicamlError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(MicamlError::parse("x").to_string().contains("parse error:"));
        assert!(
            MicamlError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            MicamlError::animation("x")
                .to_string()
                .contains("animation error:")
        );
        assert!(
            MicamlError::storage("x")
                .to_string()
                .contains("storage error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = MicamlError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
