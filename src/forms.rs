//! Validation of the editor's submission and save forms.
//!
//! Validation is pure: the set of valid application names is fetched by the
//! caller and passed in on every call.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::design::codec::{params_to_job_data, parse_params};
use crate::design::{JobParam, SparkDesign};
use crate::jobserver::JobSubmission;

const REQUIRED: &str = "This field is required.";
const MAX_NAME_LEN: usize = 64;
const MAX_DESC_LEN: usize = 1024;

/// Raw submission fields as posted by the editor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionFields {
    #[serde(rename = "appName")]
    pub app_name: Option<String>,
    #[serde(rename = "classPath")]
    pub class_path: Option<String>,
    /// JSON list of `{name, value}` objects
    pub params: Option<String>,
    /// Checkbox
    #[serde(rename = "autoContext")]
    pub auto_context: Option<String>,
    pub context: Option<String>,
}

/// Submission fields plus the save form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveFields {
    #[serde(flatten)]
    pub query: SubmissionFields,
    pub name: Option<String>,
    pub desc: Option<String>,
    /// Checkbox: store as a new design even when editing an existing one
    pub saveas: Option<String>,
}

/// Field name -> error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub app_name: String,
    pub class_path: String,
    pub auto_context: bool,
    /// Context as entered, kept even when `auto_context` overrides it
    pub context: Option<String>,
    pub params: Vec<JobParam>,
    raw_params: String,
}

impl ValidSubmission {
    /// Context the job should run in; `None` asks for an automatic one.
    pub fn target_context(&self) -> Option<&str> {
        if self.auto_context {
            None
        } else {
            self.context.as_deref()
        }
    }

    pub fn job_data(&self) -> String {
        params_to_job_data(&self.params)
    }

    pub fn to_job_submission(&self) -> JobSubmission {
        JobSubmission {
            app_name: self.app_name.clone(),
            class_path: self.class_path.clone(),
            data: self.job_data(),
            context: self.target_context().map(str::to_string),
            sync: false,
        }
    }

    pub fn to_spark_design(&self) -> SparkDesign {
        SparkDesign {
            app_name: self.app_name.clone(),
            class_path: self.class_path.clone(),
            auto_context: self.auto_context,
            context: self.context.clone(),
            params: self.raw_params.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSave {
    pub query: ValidSubmission,
    pub name: String,
    pub desc: String,
    pub save_as: bool,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(errors: &mut FormErrors, field: &str, value: Option<&str>) -> Option<String> {
    let value = non_blank(value);
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

/// HTML checkbox semantics: unchecked boxes are absent or falsy strings.
pub fn checkbox(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => false,
        Some(v) => !matches!(v.as_str(), "" | "false" | "0" | "off"),
    }
}

pub fn validate_submission(
    fields: &SubmissionFields,
    known_app_names: &[String],
) -> Result<ValidSubmission, FormErrors> {
    let mut errors = FormErrors::default();

    let app_name = required(&mut errors, "appName", fields.app_name.as_deref());
    if let Some(name) = &app_name {
        if !known_app_names.iter().any(|known| known == name) {
            errors.add(
                "appName",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    name
                ),
            );
        }
    }

    let class_path = required(&mut errors, "classPath", fields.class_path.as_deref());

    let raw_params = non_blank(fields.params.as_deref()).unwrap_or_else(|| "[]".to_string());
    let params = match parse_params(&raw_params) {
        Ok(params) => params,
        Err(e) => {
            errors.add(
                "params",
                format!("Parameters must be a JSON list of name/value pairs ({})", e),
            );
            Vec::new()
        }
    };

    let auto_context = checkbox(fields.auto_context.as_deref());
    let context = non_blank(fields.context.as_deref());
    if !auto_context && context.is_none() {
        errors.add(
            "context",
            "A context is required unless an automatic context is used.",
        );
    }

    let (Some(app_name), Some(class_path)) = (app_name, class_path) else {
        return Err(errors);
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidSubmission {
        app_name,
        class_path,
        auto_context,
        context,
        params,
        raw_params,
    })
}

pub fn validate_save(
    fields: &SaveFields,
    known_app_names: &[String],
) -> Result<ValidSave, FormErrors> {
    let mut errors = FormErrors::default();

    let query = match validate_submission(&fields.query, known_app_names) {
        Ok(query) => Some(query),
        Err(query_errors) => {
            errors.merge(query_errors);
            None
        }
    };

    let name = required(&mut errors, "name", fields.name.as_deref());
    if let Some(name) = &name {
        if name.chars().count() > MAX_NAME_LEN {
            errors.add(
                "name",
                format!("Ensure this value has at most {} characters.", MAX_NAME_LEN),
            );
        }
    }

    let desc = non_blank(fields.desc.as_deref()).unwrap_or_default();
    if desc.chars().count() > MAX_DESC_LEN {
        errors.add(
            "desc",
            format!("Ensure this value has at most {} characters.", MAX_DESC_LEN),
        );
    }

    match (query, name) {
        (Some(query), Some(name)) if errors.is_empty() => Ok(ValidSave {
            query,
            name,
            desc,
            save_as: checkbox(fields.saveas.as_deref()),
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apps() -> Vec<String> {
        vec!["wordcount".to_string(), "sql".to_string()]
    }

    fn fields() -> SubmissionFields {
        SubmissionFields {
            app_name: Some("wordcount".to_string()),
            class_path: Some("spark.jobserver.WordCountExample".to_string()),
            params: Some(r#"[{"name":"input.string","value":"a b"}]"#.to_string()),
            auto_context: Some("true".to_string()),
            context: None,
        }
    }

    #[test]
    fn valid_submission() {
        let valid = validate_submission(&fields(), &apps()).unwrap();
        assert_eq!(valid.app_name, "wordcount");
        assert!(valid.auto_context);
        assert_eq!(valid.target_context(), None);
        assert_eq!(valid.job_data(), "input.string=a b");
    }

    #[test]
    fn unknown_app_name_is_rejected() {
        let f = SubmissionFields {
            app_name: Some("missing".to_string()),
            ..fields()
        };
        let errors = validate_submission(&f, &apps()).unwrap_err();
        assert_eq!(errors.get("appName").unwrap().len(), 1);
        assert!(errors.get("appName").unwrap()[0].contains("missing"));
    }

    #[test]
    fn required_fields() {
        let errors = validate_submission(&SubmissionFields::default(), &apps()).unwrap_err();
        assert_eq!(errors.get("appName").unwrap(), [REQUIRED.to_string()]);
        assert_eq!(errors.get("classPath").unwrap(), [REQUIRED.to_string()]);
        assert!(errors.get("context").is_some());
        assert!(errors.get("params").is_none());
    }

    #[test]
    fn blank_class_path_is_missing() {
        let f = SubmissionFields {
            class_path: Some("   ".to_string()),
            ..fields()
        };
        let errors = validate_submission(&f, &apps()).unwrap_err();
        assert!(errors.get("classPath").is_some());
    }

    #[test]
    fn params_must_be_a_list_of_pairs() {
        let f = SubmissionFields {
            params: Some(r#"{"name":"x"}"#.to_string()),
            ..fields()
        };
        let errors = validate_submission(&f, &apps()).unwrap_err();
        assert!(errors.get("params").is_some());

        let f = SubmissionFields {
            params: None,
            ..fields()
        };
        let valid = validate_submission(&f, &apps()).unwrap();
        assert!(valid.params.is_empty());
        assert_eq!(valid.to_spark_design().params, "[]");
    }

    #[test]
    fn auto_context_ignores_context() {
        let f = SubmissionFields {
            context: Some("shared".to_string()),
            ..fields()
        };
        let valid = validate_submission(&f, &apps()).unwrap();
        assert_eq!(valid.target_context(), None);
        assert_eq!(valid.context.as_deref(), Some("shared"));
        assert_eq!(valid.to_job_submission().context, None);
    }

    #[test]
    fn explicit_context_is_required_without_auto_context() {
        let f = SubmissionFields {
            auto_context: Some("false".to_string()),
            ..fields()
        };
        let errors = validate_submission(&f, &apps()).unwrap_err();
        assert!(errors.get("context").is_some());

        let f = SubmissionFields {
            auto_context: None,
            context: Some("shared".to_string()),
            ..fields()
        };
        let valid = validate_submission(&f, &apps()).unwrap();
        let submission = valid.to_job_submission();
        assert_eq!(submission.context.as_deref(), Some("shared"));
        assert!(!submission.sync);
    }

    #[test]
    fn checkbox_values() {
        assert!(!checkbox(None));
        assert!(!checkbox(Some("")));
        assert!(!checkbox(Some("false")));
        assert!(!checkbox(Some("OFF")));
        assert!(!checkbox(Some("0")));
        assert!(checkbox(Some("on")));
        assert!(checkbox(Some("true")));
    }

    #[test]
    fn save_requires_name() {
        let f = SaveFields {
            query: fields(),
            ..Default::default()
        };
        let errors = validate_save(&f, &apps()).unwrap_err();
        assert!(errors.get("name").is_some());
        assert_eq!(errors.to_string(), format!("name: {}", REQUIRED));
    }

    #[test]
    fn save_collects_query_and_save_errors() {
        let f = SaveFields {
            query: SubmissionFields::default(),
            name: Some("x".repeat(MAX_NAME_LEN + 1)),
            desc: None,
            saveas: None,
        };
        let errors = validate_save(&f, &apps()).unwrap_err();
        assert!(errors.get("appName").is_some());
        assert!(errors.get("name").is_some());
    }

    #[test]
    fn valid_save() {
        let f = SaveFields {
            query: fields(),
            name: Some("Word count".to_string()),
            desc: Some("counts words".to_string()),
            saveas: Some("on".to_string()),
        };
        let save = validate_save(&f, &apps()).unwrap();
        assert_eq!(save.name, "Word count");
        assert_eq!(save.desc, "counts words");
        assert!(save.save_as);
        assert_eq!(save.query.app_name, "wordcount");
    }

    #[test]
    fn errors_render_field_by_field() {
        let mut errors = FormErrors::default();
        errors.add("classPath", REQUIRED);
        errors.add("appName", "bad");
        errors.add("appName", "worse");
        assert_eq!(
            errors.to_string(),
            format!("appName: bad worse; classPath: {}", REQUIRED)
        );
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["appName"][1], "worse");
    }
}
