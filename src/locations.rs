//! Hierarchical location picker.
//!
//! Walks the server's location tree one level at a time (country, state,
//! city, district, ...) until the user picks a node without children.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{ApiRequest, Transport, decode_field};
use crate::error::ApiError;
use crate::i18n::{Locale, Message, localized};
use crate::model::LocationItem;

/// Supplies one level of the location tree.
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Roots when `parent_id` is `None`, otherwise the children of `parent_id`.
    async fn children(&self, parent_id: Option<&str>) -> Result<Vec<LocationItem>, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> LocationSource for T {
    async fn children(&self, parent_id: Option<&str>) -> Result<Vec<LocationItem>, ApiError> {
        let mut request = ApiRequest::get("/locations");
        if let Some(parent) = parent_id.filter(|p| !p.is_empty()) {
            request = request.with_query("parent_id", parent);
        }
        let data = self.send(request).await?;
        decode_field(data, "locations")
    }
}

/// The picked leaf and the localized names leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSelection {
    pub location_id: String,
    pub breadcrumb: Vec<String>,
}

impl LocationSelection {
    /// `"Türkiye › İstanbul › Kadıköy"`.
    pub fn label(&self) -> String {
        self.breadcrumb.join(" › ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// The item has children; they are now the options.
    Descended,
    Resolved(LocationSelection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerBack {
    /// Moved up one level.
    Up,
    /// Already at the root; the picker should close.
    Cancelled,
}

#[derive(Debug, Clone)]
struct PathEntry {
    id: String,
    name: String,
}

pub struct LocationPicker<S: ?Sized = dyn LocationSource> {
    source: Arc<S>,
    locale: Locale,
    path: Vec<PathEntry>,
    options: Vec<LocationItem>,
    error: Option<String>,
}

impl<S: LocationSource + ?Sized> LocationPicker<S> {
    pub fn new(source: Arc<S>, locale: Locale) -> Self {
        Self {
            source,
            locale,
            path: Vec::new(),
            options: Vec::new(),
            error: None,
        }
    }

    /// Load the root level.
    pub async fn open(&mut self) -> Result<(), ApiError> {
        self.load_level(None).await
    }

    /// Replace the options with the children of `parent_id`. On failure the
    /// options are emptied, the path is kept and a retryable error is set.
    pub async fn load_level(&mut self, parent_id: Option<&str>) -> Result<(), ApiError> {
        self.error = None;
        match self.source.children(parent_id).await {
            Ok(items) => {
                self.options = items;
                Ok(())
            }
            Err(e) => {
                debug!(parent = ?parent_id, error = %e, "Location level failed to load");
                self.options.clear();
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Reload the current level after a failure.
    pub async fn retry(&mut self) -> Result<(), ApiError> {
        let parent = self.path.last().map(|p| p.id.clone());
        self.load_level(parent.as_deref()).await
    }

    /// Pick an option. A node without children resolves the picker.
    pub async fn select_item(&mut self, item: &LocationItem) -> Result<PickOutcome, ApiError> {
        let name = localized(&item.name, self.locale).into_owned();
        let children = match self.source.children(Some(&item.id)).await {
            Ok(children) => children,
            Err(e) => {
                self.error = Some(e.user_message());
                return Err(e);
            }
        };
        self.error = None;

        if children.is_empty() {
            let mut breadcrumb = self.breadcrumb();
            breadcrumb.push(name);
            return Ok(PickOutcome::Resolved(LocationSelection {
                location_id: item.id.clone(),
                breadcrumb,
            }));
        }

        self.path.push(PathEntry {
            id: item.id.clone(),
            name,
        });
        self.options = children;
        Ok(PickOutcome::Descended)
    }

    pub async fn back(&mut self) -> Result<PickerBack, ApiError> {
        if self.path.pop().is_none() {
            return Ok(PickerBack::Cancelled);
        }
        let parent = self.path.last().map(|p| p.id.clone());
        self.load_level(parent.as_deref()).await?;
        Ok(PickerBack::Up)
    }

    pub fn options(&self) -> &[LocationItem] {
        &self.options
    }

    pub fn option_name(&self, item: &LocationItem) -> String {
        localized(&item.name, self.locale).into_owned()
    }

    pub fn breadcrumb(&self) -> Vec<String> {
        self.path.iter().map(|p| p.name.clone()).collect()
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Heading for the current level, from the type of its options.
    pub fn step_label(&self, locale: Locale) -> String {
        let message = match self.options.first().map(|o| o.kind.as_str()) {
            Some("country") => Message::SelectCountry,
            Some("state") => Message::SelectState,
            Some("city") => Message::SelectCity,
            Some("district") => Message::SelectDistrict,
            _ => Message::SelectLocation,
        };
        message.render(locale)
    }
}
