use axum::extract::{
    Multipart,
    multipart::{MultipartError, MultipartRejection},
};
use bytes::Bytes;

use crate::proxy::error::ProxyError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| content_type.starts_with("image/"))
    }
}

#[derive(Debug, Clone)]
enum Part {
    Text(String),
    File(UploadedFile),
}

/// A multipart body read fully into memory, in field order.
#[derive(Debug, Clone, Default)]
pub struct ReceivedForm {
    parts: Vec<(String, Part)>,
}

impl ReceivedForm {
    pub async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, ProxyError> {
        let mut multipart = multipart.map_err(|rejection| {
            ProxyError::rejected_body(rejection.status(), rejection.body_text())
        })?;
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            let part = match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(multipart_error)?;
                    Part::File(UploadedFile {
                        file_name: Some(file_name),
                        content_type,
                        data,
                    })
                }
                None => Part::Text(field.text().await.map_err(multipart_error)?),
            };
            form.parts.push((name, part));
        }

        Ok(form)
    }

    /// First non-empty text value for `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts(name).into_iter().find(|value| !value.is_empty())
    }

    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter(|(field, _)| field == name)
            .filter_map(|(_, part)| match part {
                Part::Text(value) => Some(value.as_str()),
                Part::File(_) => None,
            })
            .collect()
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files(name).into_iter().next()
    }

    pub fn files(&self, name: &str) -> Vec<&UploadedFile> {
        self.parts
            .iter()
            .filter(|(field, _)| field == name)
            .filter_map(|(_, part)| match part {
                Part::File(file) => Some(file),
                Part::Text(_) => None,
            })
            .collect()
    }
}

fn multipart_error(err: MultipartError) -> ProxyError {
    ProxyError::rejected_body(
        err.status(),
        format!("Invalid multipart body: {}", err.body_text()),
    )
}
