use crate::MigrationReport;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WidgetSpans {
    pub min_span_x: i32,
    pub min_span_y: i32,
}

impl WidgetSpans {
    /// Used when the provider of a widget cannot be resolved.
    pub const FALLBACK: WidgetSpans = WidgetSpans {
        min_span_x: 2,
        min_span_y: 2,
    };
}

pub trait WidgetMetadataResolver: Send + Sync {
    fn min_spans(&self, provider: &str) -> Option<WidgetSpans>;
}

pub trait MigrationDelegate: Send + Sync {
    fn on_migration_finished(&self, report: &MigrationReport);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoWidgetMetadata;

impl WidgetMetadataResolver for NoWidgetMetadata {
    fn min_spans(&self, _provider: &str) -> Option<WidgetSpans> {
        None
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize)]
#[serde(transparent)]
pub struct StaticWidgetMetadata {
    providers: HashMap<String, WidgetSpans>,
}

impl StaticWidgetMetadata {
    pub fn insert(&mut self, provider: impl Into<String>, spans: WidgetSpans) {
        self.providers.insert(provider.into(), spans);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl WidgetMetadataResolver for StaticWidgetMetadata {
    fn min_spans(&self, provider: &str) -> Option<WidgetSpans> {
        self.providers.get(provider.trim()).copied()
    }
}
