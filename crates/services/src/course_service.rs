use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use exam_core::model::{CourseId, UserId};

use crate::api::ApiClient;
use crate::authoring::non_blank;
use crate::error::{ApiError, AuthoringError};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseTeacher {
    pub id: UserId,
    pub name: String,
}

/// A course as listed in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Decimal price as sent by the API, e.g. `"499.00"`.
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub teacher_id: UserId,
    #[serde(default)]
    pub teacher: Option<CourseTeacher>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Course {
    #[must_use]
    pub fn teacher_name(&self) -> Option<&str> {
        self.teacher.as_ref().map(|teacher| teacher.name.as_str())
    }
}

/// Cover image uploaded with a new course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Input for `CourseService::create_course`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub tags: Vec<String>,
    pub image: CourseImage,
}

impl NewCourse {
    /// Validated text fields of the multipart form, in upload order.
    fn form_fields(&self) -> Result<Vec<(&'static str, String)>, AuthoringError> {
        let title = non_blank(&self.title, "title")?;
        let description = non_blank(&self.description, "description")?;
        let category = non_blank(&self.category, "category")?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AuthoringError::InvalidAmount { field: "price" });
        }
        if !self.image.content_type.starts_with("image/") {
            return Err(AuthoringError::NotAnImage(self.image.content_type.clone()));
        }

        let tags = self
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        Ok(vec![
            ("title", title.to_string()),
            ("description", description.to_string()),
            ("price", self.price.to_string()),
            ("category", category.to_string()),
            ("tags", tags),
        ])
    }

    fn into_form(self) -> Result<Form, AuthoringError> {
        let form = self
            .form_fields()?
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));
        let image = Part::bytes(self.image.bytes)
            .file_name(self.image.file_name)
            .mime_str(&self.image.content_type)
            .map_err(ApiError::from)?;
        Ok(form.part("image", image))
    }
}

#[derive(Clone, Debug)]
pub struct CourseService {
    api: ApiClient,
}

impl CourseService {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// List every course visible to the current user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.api.get_json("/courses", &[]).await
    }

    /// Create a course with its cover image. Teachers only; the API decides.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError` for a blank field, a negative price or a
    /// non-image upload, and `AuthoringError::Api` if the request fails.
    pub async fn create_course(&self, course: NewCourse) -> Result<(), AuthoringError> {
        let title = course.title.trim().to_string();
        let form = course.into_form()?;
        self.api.post_multipart("/courses", form).await?;
        info!(%title, "course created");
        Ok(())
    }
}
