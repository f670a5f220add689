use serde::{Deserialize, Serialize};

use crate::model::{ExistingIssue, NewIssue};

#[derive(Deserialize, Debug, Default)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
}

#[derive(Deserialize, Debug)]
pub struct IssueResp {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Deserialize, Debug)]
pub struct SearchResp {
    #[serde(default)]
    pub issues: Vec<IssueResp>,
}

#[derive(Deserialize, Debug)]
pub struct CreateIssueResp {
    pub key: String,
}

#[derive(Serialize, Debug)]
pub struct KeyRef<'a> {
    pub key: &'a str,
}

#[derive(Serialize, Debug)]
pub struct NameRef<'a> {
    pub name: &'a str,
}

#[derive(Serialize, Debug)]
pub struct CreateFields<'a> {
    pub project: KeyRef<'a>,
    #[serde(rename = "issuetype")]
    pub issue_type: NameRef<'a>,
    pub summary: &'a str,
    pub description: &'a str,
    pub labels: &'a [String],
}

#[derive(Serialize, Debug)]
pub struct CreateIssueReq<'a> {
    pub fields: CreateFields<'a>,
}

impl From<IssueResp> for ExistingIssue {
    fn from(issue: IssueResp) -> Self {
        ExistingIssue {
            key: issue.key,
            title: issue.fields.summary,
        }
    }
}

impl<'a> From<&'a NewIssue> for CreateIssueReq<'a> {
    fn from(issue: &'a NewIssue) -> Self {
        CreateIssueReq {
            fields: CreateFields {
                project: KeyRef {
                    key: &issue.project_key,
                },
                issue_type: NameRef {
                    name: &issue.issue_type,
                },
                summary: &issue.summary,
                description: &issue.description,
                labels: &issue.labels,
            },
        }
    }
}
