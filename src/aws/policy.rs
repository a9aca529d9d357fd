//! Inline IAM policy attached to federation tokens.

use serde::Serialize;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: &'static str,
    pub statement: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: &'static str,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

impl PolicyDocument {
    /// Allows `s3:PutObject` into `bucket` and nothing else, so browsers
    /// holding the temporary credentials can upload but never read or list.
    pub fn put_object_only(bucket: &str) -> Self {
        Self {
            version: POLICY_VERSION,
            statement: vec![Statement {
                effect: "Allow",
                action: vec!["s3:PutObject".to_string()],
                resource: vec![
                    format!("arn:aws:s3:::{}/*", bucket),
                    format!("arn:aws:s3:::{}", bucket),
                ],
            }],
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_object_policy_shape() {
        let policy = PolicyDocument::put_object_only("uploads");
        let value: serde_json::Value =
            serde_json::from_str(&policy.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": ["s3:PutObject"],
                    "Resource": ["arn:aws:s3:::uploads/*", "arn:aws:s3:::uploads"]
                }]
            })
        );
    }
}
