use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::framework::AppError;

/// 保存された LinkedIn のつながり
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "connections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub full_name: String,
    pub profile_url: String,
    pub headline: Option<String>,
    pub company: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// 作成リクエスト
#[derive(Clone, Debug, Deserialize)]
pub struct NewConnection {
    pub full_name: String,
    pub profile_url: String,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewConnection {
    /// 前後の空白を落とし, 必須項目が空なら `BadRequest`.
    pub fn validate(self) -> Result<Self, AppError> {
        Ok(Self {
            full_name: required("full_name", self.full_name)?,
            profile_url: required("profile_url", self.profile_url)?,
            headline: optional(self.headline),
            company: optional(self.company),
            notes: optional(self.notes),
        })
    }

    pub fn into_model(self, id: String, owner_id: &str, now: DateTime<Utc>) -> Model {
        Model {
            id,
            owner_id: owner_id.to_owned(),
            full_name: self.full_name,
            profile_url: self.profile_url,
            headline: self.headline,
            company: self.company,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 部分更新. `None` の項目は変えない. 任意項目に空文字を送ると消える.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConnectionPatch {
    pub full_name: Option<String>,
    pub profile_url: Option<String>,
    pub headline: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
}

impl ConnectionPatch {
    pub fn validate(self) -> Result<Self, AppError> {
        Ok(Self {
            full_name: self
                .full_name
                .map(|v| required("full_name", v))
                .transpose()?,
            profile_url: self
                .profile_url
                .map(|v| required("profile_url", v))
                .transpose()?,
            ..self
        })
    }

    pub fn apply(self, model: &mut Model, now: DateTime<Utc>) {
        if let Some(v) = self.full_name {
            model.full_name = v;
        }
        if let Some(v) = self.profile_url {
            model.profile_url = v;
        }
        if self.headline.is_some() {
            model.headline = optional(self.headline);
        }
        if self.company.is_some() {
            model.company = optional(self.company);
        }
        if self.notes.is_some() {
            model.notes = optional(self.notes);
        }
        model.updated_at = now;
    }
}

fn required(field: &str, value: String) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::BadRequest(format!("{field} must not be empty")))
    } else {
        Ok(value.to_string())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_connection() -> NewConnection {
        NewConnection {
            full_name: "  Ada Lovelace ".into(),
            profile_url: "https://www.linkedin.com/in/ada".into(),
            headline: Some("".into()),
            company: Some(" Analytical Engines ".into()),
            notes: None,
        }
    }

    #[test]
    fn validate_trims_and_drops_blank_optionals() {
        let input = new_connection().validate().unwrap();
        assert_eq!(input.full_name, "Ada Lovelace");
        assert_eq!(input.headline, None);
        assert_eq!(input.company.as_deref(), Some("Analytical Engines"));
    }

    #[test]
    fn blank_required_field_is_bad_request() {
        let input = NewConnection {
            profile_url: "   ".into(),
            ..new_connection()
        };
        assert!(matches!(
            input.validate(),
            Err(AppError::BadRequest(msg)) if msg.contains("profile_url")
        ));
    }

    #[test]
    fn patch_updates_only_given_fields() {
        let created = Utc::now();
        let mut model = new_connection()
            .validate()
            .unwrap()
            .into_model("01J".into(), "user-1", created);

        let later = created + chrono::Duration::seconds(5);
        ConnectionPatch {
            notes: Some("met at RustConf".into()),
            company: Some("".into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
        .apply(&mut model, later);

        assert_eq!(model.full_name, "Ada Lovelace");
        assert_eq!(model.notes.as_deref(), Some("met at RustConf"));
        assert_eq!(model.company, None);
        assert_eq!(model.created_at, created);
        assert_eq!(model.updated_at, later);
    }

    #[test]
    fn patch_rejects_blank_required_field() {
        let patch = ConnectionPatch {
            full_name: Some(" ".into()),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(AppError::BadRequest(_))));
    }
}
