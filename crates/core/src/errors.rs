use thiserror::Error;

/// Failure of a single conversational turn, tagged with the stage that produced it.
///
/// The orchestrator stops at the first error and turns it into a `status: "error"`
/// response; none of these are surfaced as HTTP 5xx.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("image analysis failed: {0}")]
    ImageAnalysis(String),
    #[error("classification failed: {0}")]
    Classifier(String),
    #[error("parameter refinement failed: {0}")]
    Refinement(String),
    #[error("backend gateway failed: {0}")]
    Gateway(String),
    #[error("backend write failed: {0}")]
    WriteRejected(String),
    #[error("response composition failed: {0}")]
    Composer(String),
    #[error("guided form generation failed: {0}")]
    FormFallback(String),
}

impl TurnError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::EmptyMessage => "intake",
            Self::ImageAnalysis(_) => "image_analysis",
            Self::Classifier(_) => "classifier",
            Self::Refinement(_) => "refinement",
            Self::Gateway(_) => "gateway",
            Self::WriteRejected(_) => "write",
            Self::Composer(_) => "composer",
            Self::FormFallback(_) => "form_fallback",
        }
    }

    /// Message shown to the end user in the response envelope.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyMessage => "Pesan tidak boleh kosong.".to_string(),
            Self::ImageAnalysis(detail) => format!("Gagal menganalisa gambar: {detail}"),
            Self::Classifier(detail) => {
                format!("Gagal menentukan kebutuhan kategori API: {detail}")
            }
            Self::Refinement(detail) => format!("Gagal menentukan parameter data: {detail}"),
            Self::Gateway(detail) => format!("Gagal mengambil data: {detail}"),
            Self::WriteRejected(detail) => format!("Gagal input via api: {detail}"),
            Self::Composer(detail) => format!("Gagal menginterpretasi pesan: {detail}"),
            Self::FormFallback(_) => "Gagal generate form".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::TurnError;

    #[test]
    fn classifier_error_keeps_detail_in_user_message() {
        let error = TurnError::Classifier("expected value at line 1 column 1".to_owned());

        assert_eq!(error.stage(), "classifier");
        assert!(error.user_message().starts_with("Gagal menentukan kebutuhan kategori API"));
        assert!(error.user_message().contains("line 1 column 1"));
    }

    #[test]
    fn form_fallback_hides_model_detail() {
        let error = TurnError::FormFallback("upstream returned 502".to_owned());

        assert_eq!(error.user_message(), "Gagal generate form");
        assert_eq!(error.stage(), "form_fallback");
    }

    #[test]
    fn write_rejection_uses_input_wording() {
        let error = TurnError::WriteRejected("backend returned HTTP 422".to_owned());

        assert_eq!(error.stage(), "write");
        assert_eq!(error.user_message(), "Gagal input via api: backend returned HTTP 422");
    }

    #[test]
    fn empty_message_has_intake_stage() {
        assert_eq!(TurnError::EmptyMessage.stage(), "intake");
        assert_eq!(TurnError::EmptyMessage.to_string(), "message must not be empty");
    }
}
