//! Typed front end for the four built-in legal capabilities.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::builtin::{
    AUTO_DRAFT_LEGAL_DOCUMENT, DIGITIZE_LEGAL_DOCUMENT, FLAG_POTENTIAL_ABUSE,
    SUGGEST_RELEVANT_CASE_LAWS,
};
use crate::flow::{FlowError, FlowInvoker};

/// Typed input for one built-in capability.
pub trait FlowInput {
    /// Registry name of the capability this input is for.
    const CAPABILITY: &'static str;

    /// The raw input object, keyed by the capability's field names.
    fn to_input(&self) -> Value;
}

// ----------------------------------------------------------------------------
// Digitization
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitizeLegalDocumentInput {
    /// `data:<mimetype>;base64,<encoded_data>`
    pub document_data_uri: String,
}

impl FlowInput for DigitizeLegalDocumentInput {
    const CAPABILITY: &'static str = DIGITIZE_LEGAL_DOCUMENT;

    fn to_input(&self) -> Value {
        json!({ "documentDataUri": self.document_data_uri })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitizeLegalDocumentOutput {
    pub digitized_text: String,
}

// ----------------------------------------------------------------------------
// Case-law suggestion
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRelevantCaseLawsInput {
    pub legal_document: String,
    pub query: String,
}

impl FlowInput for SuggestRelevantCaseLawsInput {
    const CAPABILITY: &'static str = SUGGEST_RELEVANT_CASE_LAWS;

    fn to_input(&self) -> Value {
        json!({
            "legalDocument": self.legal_document,
            "query": self.query,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestRelevantCaseLawsOutput {
    pub relevant_case_laws: Vec<String>,
    pub missed_sections: Vec<String>,
}

// ----------------------------------------------------------------------------
// Abuse flagging
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagPotentialAbuseInput {
    pub case_details: String,
    pub defendant_history: String,
    pub relevant_provisions: String,
}

impl FlowInput for FlagPotentialAbuseInput {
    const CAPABILITY: &'static str = FLAG_POTENTIAL_ABUSE;

    fn to_input(&self) -> Value {
        json!({
            "caseDetails": self.case_details,
            "defendantHistory": self.defendant_history,
            "relevantProvisions": self.relevant_provisions,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagPotentialAbuseOutput {
    pub abuse_detected: bool,
    pub explanation: String,
}

// ----------------------------------------------------------------------------
// Auto-drafting
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoDraftLegalDocumentInput {
    pub case_details: String,
    pub document_type: String,
    pub regional_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevant_laws: Option<String>,
}

impl FlowInput for AutoDraftLegalDocumentInput {
    const CAPABILITY: &'static str = AUTO_DRAFT_LEGAL_DOCUMENT;

    fn to_input(&self) -> Value {
        let mut input = Map::new();
        input.insert("caseDetails".into(), self.case_details.clone().into());
        input.insert("documentType".into(), self.document_type.clone().into());
        input.insert("regionalFormat".into(), self.regional_format.clone().into());
        if let Some(laws) = &self.relevant_laws {
            input.insert("relevantLaws".into(), laws.clone().into());
        }
        Value::Object(input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoDraftLegalDocumentOutput {
    pub document_text: String,
    pub consistency_check: String,
}

// ----------------------------------------------------------------------------
// Assistant
// ----------------------------------------------------------------------------

/// Calls the built-in legal capabilities with typed input and output.
///
/// Input still goes through the capability's schema, so a too-short
/// `case_details` fails with [`FlowError::Validation`] exactly as raw JSON would.
#[derive(Debug, Clone)]
pub struct LegalAssistant {
    invoker: FlowInvoker,
}

impl LegalAssistant {
    pub fn new(invoker: FlowInvoker) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &FlowInvoker {
        &self.invoker
    }

    pub async fn digitize_legal_document(
        &self,
        input: &DigitizeLegalDocumentInput,
    ) -> Result<DigitizeLegalDocumentOutput, FlowError> {
        self.call(input).await
    }

    pub async fn suggest_relevant_case_laws(
        &self,
        input: &SuggestRelevantCaseLawsInput,
    ) -> Result<SuggestRelevantCaseLawsOutput, FlowError> {
        self.call(input).await
    }

    pub async fn flag_potential_abuse(
        &self,
        input: &FlagPotentialAbuseInput,
    ) -> Result<FlagPotentialAbuseOutput, FlowError> {
        self.call(input).await
    }

    pub async fn auto_draft_legal_document(
        &self,
        input: &AutoDraftLegalDocumentInput,
    ) -> Result<AutoDraftLegalDocumentOutput, FlowError> {
        self.call(input).await
    }

    /// Run any typed input through its capability.
    pub async fn call<I, O>(&self, input: &I) -> Result<O, FlowError>
    where
        I: FlowInput,
        O: DeserializeOwned,
    {
        self.invoker.invoke_as(I::CAPABILITY, &input.to_input()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilityRegistry;
    use crate::llms::scripted::ScriptedBackend;
    use serde_json::json;
    use std::sync::Arc;

    const CASE_DETAILS: &str = "Complainant alleges the tenant forged a rent receipt dated \
                                12 January 2024 to contest eviction proceedings.";

    fn assistant(backend: Arc<ScriptedBackend>) -> LegalAssistant {
        let registry = Arc::new(CapabilityRegistry::with_builtins().unwrap());
        LegalAssistant::new(FlowInvoker::new(registry, backend))
    }

    #[test]
    fn test_input_field_names_are_camel_case() {
        let mut input = AutoDraftLegalDocumentInput {
            case_details: CASE_DETAILS.to_string(),
            document_type: "Notice".to_string(),
            regional_format: "Tamil".to_string(),
            relevant_laws: None,
        };
        let value = input.to_input();
        assert_eq!(value["caseDetails"], CASE_DETAILS);
        assert_eq!(value["regionalFormat"], "Tamil");
        assert!(value.get("relevantLaws").is_none());
        assert_eq!(value, serde_json::to_value(&input).unwrap());

        input.relevant_laws = Some("Order XXI CPC".to_string());
        assert_eq!(input.to_input()["relevantLaws"], "Order XXI CPC");
        assert_eq!(
            AutoDraftLegalDocumentInput::CAPABILITY,
            AUTO_DRAFT_LEGAL_DOCUMENT
        );
    }

    #[test]
    fn test_to_input_matches_serde_shape() {
        let abuse = FlagPotentialAbuseInput {
            case_details: CASE_DETAILS.to_string(),
            defendant_history: "Two prior bail applications.".to_string(),
            relevant_provisions: "Section 437 CrPC".to_string(),
        };
        assert_eq!(abuse.to_input(), serde_json::to_value(&abuse).unwrap());

        let laws = SuggestRelevantCaseLawsInput {
            legal_document: CASE_DETAILS.to_string(),
            query: "eviction precedents".to_string(),
        };
        assert_eq!(laws.to_input(), serde_json::to_value(&laws).unwrap());

        let scan = DigitizeLegalDocumentInput {
            document_data_uri: "data:text/plain;base64,aGVsbG8=".to_string(),
        };
        assert_eq!(scan.to_input(), serde_json::to_value(&scan).unwrap());
    }

    #[tokio::test]
    async fn test_auto_draft_without_relevant_laws() {
        let backend = Arc::new(ScriptedBackend::replying(json!({
            "documentText": "LEGAL NOTICE ...",
            "consistencyCheck": "Consistent with Order XXI CPC.",
        })));
        let assistant = assistant(backend.clone());

        let output = assistant
            .auto_draft_legal_document(&AutoDraftLegalDocumentInput {
                case_details: CASE_DETAILS.to_string(),
                document_type: "Notice".to_string(),
                regional_format: "English".to_string(),
                relevant_laws: None,
            })
            .await
            .unwrap();
        assert_eq!(output.document_text, "LEGAL NOTICE ...");

        let prompt = backend.last_prompt().unwrap().text();
        assert!(prompt.contains("Document Type: Notice"));
        assert!(prompt.contains("Relevant Laws: \n"));
    }

    #[tokio::test]
    async fn test_suggest_case_laws_typed() {
        let backend = Arc::new(ScriptedBackend::replying(json!({
            "relevantCaseLaws": ["Arnesh Kumar v. State of Bihar (2014)"],
            "missedSections": ["Section 41A CrPC"],
        })));
        let assistant = assistant(backend);

        let output = assistant
            .suggest_relevant_case_laws(&SuggestRelevantCaseLawsInput {
                legal_document: CASE_DETAILS.to_string(),
                query: "arrest without notice".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(output.relevant_case_laws.len(), 1);
        assert_eq!(output.missed_sections, vec!["Section 41A CrPC"]);
    }

    #[tokio::test]
    async fn test_flag_abuse_short_history_is_rejected() {
        let backend = Arc::new(ScriptedBackend::replying(json!({
            "abuseDetected": false,
            "explanation": "n/a",
        })));
        let assistant = assistant(backend.clone());

        let err = assistant
            .flag_potential_abuse(&FlagPotentialAbuseInput {
                case_details: CASE_DETAILS.to_string(),
                defendant_history: "none".to_string(),
                relevant_provisions: "Section 437 CrPC".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("defendantHistory"));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_digitize_typed() {
        let backend = Arc::new(ScriptedBackend::replying(json!({
            "digitizedText": "AFFIDAVIT\nI, the deponent ...",
        })));
        let assistant = assistant(backend);

        let output = assistant
            .digitize_legal_document(&DigitizeLegalDocumentInput {
                document_data_uri: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
            })
            .await
            .unwrap();
        assert!(output.digitized_text.starts_with("AFFIDAVIT"));
    }
}
