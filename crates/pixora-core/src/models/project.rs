use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::reference::AssetReference;

/// Canvas size used when the asset store reports no dimensions
pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;

/// An editing project as stored by the persistence service.
///
/// `width`/`height` are the fixed logical canvas dimensions; transformations
/// change the image's pixel size, never these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub original_image_url: AssetReference,
    pub current_image_url: AssetReference,
    #[serde(default)]
    pub thumbnail_url: Option<AssetReference>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub canvas_state: Option<serde_json::Value>,
    #[serde(default)]
    pub active_transformations: Option<String>,
    #[serde(default)]
    pub background_removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Whether the current image differs from the uploaded original
    pub fn is_edited(&self) -> bool {
        self.current_image_url != self.original_image_url
    }
}

/// Request DTO for creating a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    pub original_image_url: AssetReference,
    pub current_image_url: AssetReference,
    #[serde(default)]
    pub thumbnail_url: Option<AssetReference>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub canvas_state: Option<serde_json::Value>,
}

/// Partial update of a project.
///
/// Every present field is a full replacement value. Clearable fields use a
/// double `Option`: `Some(None)` clears, `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_image_url: Option<AssetReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_state: Option<serde_json::Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub active_transformations: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_removed: Option<bool>,
}

/// Keep an explicit `null` as `Some(None)` instead of collapsing it to `None`
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.current_image_url.is_none()
            && self.canvas_state.is_none()
            && self.active_transformations.is_none()
            && self.background_removed.is_none()
    }

    /// Apply this update to a project record
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(ref url) = self.current_image_url {
            project.current_image_url = url.clone();
        }
        if let Some(ref state) = self.canvas_state {
            project.canvas_state = Some(state.clone());
        }
        if let Some(ref transformations) = self.active_transformations {
            project.active_transformations = transformations.clone();
        }
        if let Some(removed) = self.background_removed {
            project.background_removed = removed;
        }
        project.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            title: "Beach".to_string(),
            original_image_url: AssetReference::new("img.png"),
            current_image_url: AssetReference::new("img.png?tr=e-bgremove"),
            thumbnail_url: None,
            width: 800,
            height: 600,
            canvas_state: None,
            active_transformations: Some("e-bgremove".to_string()),
            background_removed: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_update_clears_transformations() {
        let mut project = project();
        let update = ProjectUpdate {
            current_image_url: Some(project.original_image_url.clone()),
            active_transformations: Some(None),
            background_removed: Some(false),
            ..Default::default()
        };
        update.apply_to(&mut project);

        assert!(!project.is_edited());
        assert_eq!(project.active_transformations, None);
        assert!(!project.background_removed);
    }

    #[test]
    fn test_update_serializes_only_present_fields() {
        let update = ProjectUpdate {
            canvas_state: Some(serde_json::json!({"objects": []})),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"canvasState": {"objects": []}}));
        assert!(!update.is_empty());
        assert!(ProjectUpdate::default().is_empty());
    }

    #[test]
    fn test_update_clear_serializes_null() {
        let update = ProjectUpdate {
            active_transformations: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"activeTransformations": null}));

        let decoded: ProjectUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.active_transformations, Some(None));
    }
}
