//! Form submissions posted to the router.
//!
//! ExtJS submits forms (and iframe file uploads) as ordinary form fields with
//! the routing information carried in `extAction`, `extMethod`, `extTID`,
//! `extUpload` and `extType`. Everything else is handed to the handler.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::errors::DispatchError;
use super::request::RpcRequest;

const FIELD_ACTION: &str = "extAction";
const FIELD_METHOD: &str = "extMethod";
const FIELD_TID: &str = "extTID";
const FIELD_UPLOAD: &str = "extUpload";
const FIELD_TYPE: &str = "extType";

/// A decoded form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRequest {
    /// Namespace (Ext.Direct "action").
    pub action: String,
    /// Method within the namespace.
    pub method: String,
    /// Transaction id exactly as submitted.
    pub tid: String,
    /// Whether the response must be wrapped for an iframe upload.
    pub upload: bool,
    /// Remaining form fields.
    pub fields: BTreeMap<String, String>,
}

impl FormRequest {
    /// Extracts routing fields from submitted form data.
    ///
    /// `extType` is accepted and discarded. A repeated field keeps its last
    /// value.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::MalformedRequest` when `extAction`,
    /// `extMethod` or `extTID` is missing.
    pub fn from_fields<I, K, V>(fields: I) -> Result<Self, DispatchError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut remaining: BTreeMap<String, String> = fields
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        let action = take_required(&mut remaining, FIELD_ACTION)?;
        let method = take_required(&mut remaining, FIELD_METHOD)?;
        let tid = take_required(&mut remaining, FIELD_TID)?;
        let upload = remaining
            .remove(FIELD_UPLOAD)
            .is_some_and(|value| value == "true");
        remaining.remove(FIELD_TYPE);

        Ok(Self {
            action,
            method,
            tid,
            upload,
            fields: remaining,
        })
    }

    /// Form fields as the JSON object passed to the handler.
    #[must_use]
    pub fn fields_object(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect()
    }

    pub(crate) fn to_request(&self) -> RpcRequest {
        RpcRequest {
            action: self.action.clone(),
            method: self.method.clone(),
            data: None,
            tid: Value::String(self.tid.clone()),
            kind: Some("rpc".to_owned()),
        }
    }
}

fn take_required(
    fields: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<String, DispatchError> {
    fields
        .remove(key)
        .ok_or_else(|| DispatchError::malformed(format!("missing form field '{key}'")))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn routing_fields_are_extracted() {
        let form = FormRequest::from_fields([
            ("extAction", "profile"),
            ("extMethod", "update"),
            ("extTID", "12"),
            ("extUpload", "true"),
            ("extType", "rpc"),
            ("email", "ada@example.com"),
        ])
        .expect("valid form");

        assert_eq!(form.action, "profile");
        assert_eq!(form.method, "update");
        assert_eq!(form.tid, "12");
        assert!(form.upload);
        assert_eq!(
            Value::Object(form.fields_object()),
            json!({"email": "ada@example.com"})
        );
        assert_eq!(form.to_request().tid, json!("12"));
    }

    #[rstest]
    #[case::absent(None)]
    #[case::false_value(Some("false"))]
    fn upload_requires_literal_true(#[case] upload: Option<&str>) {
        let mut fields = vec![
            ("extAction", "profile"),
            ("extMethod", "update"),
            ("extTID", "1"),
        ];
        if let Some(value) = upload {
            fields.push(("extUpload", value));
        }
        let form = FormRequest::from_fields(fields).expect("valid form");
        assert!(!form.upload);
    }

    #[rstest]
    #[case::action("extAction")]
    #[case::method("extMethod")]
    #[case::tid("extTID")]
    fn missing_routing_field_is_malformed(#[case] missing: &str) {
        let fields = [
            ("extAction", "profile"),
            ("extMethod", "update"),
            ("extTID", "1"),
        ]
        .into_iter()
        .filter(|(key, _)| *key != missing);
        let error = FormRequest::from_fields(fields).expect_err("incomplete form");
        assert!(error.location().contains(missing));
    }
}
