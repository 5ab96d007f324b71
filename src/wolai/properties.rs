use crate::library::WoteroItem;
use crate::prefs::PageTitleFormat;
use crate::wolai::{RecordFields, Schema, rich_text};
use serde_json::Value;
use std::sync::Arc;

/// Key of the title field every database has.
pub const TITLE_FIELD: &str = "title";

/// Optional fields, emitted only when the database declares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Abstract,
    Authors,
    Date,
    Doi,
    Editors,
    FilePath,
    FullCitation,
    InTextCitation,
    ItemType,
    ShortTitle,
    /// A text column holding one tag per line. Select and multi-select
    /// columns are not supported.
    Tags,
    Title,
    Url,
    Year,
    ZoteroUri,
}

impl Property {
    pub const ALL: [Property; 15] = [
        Property::Abstract,
        Property::Authors,
        Property::Date,
        Property::Doi,
        Property::Editors,
        Property::FilePath,
        Property::FullCitation,
        Property::InTextCitation,
        Property::ItemType,
        Property::ShortTitle,
        Property::Tags,
        Property::Title,
        Property::Url,
        Property::Year,
        Property::ZoteroUri,
    ];

    /// Column name in the database.
    pub fn name(self) -> &'static str {
        match self {
            Property::Abstract => "Abstract",
            Property::Authors => "Authors",
            Property::Date => "Date",
            Property::Doi => "DOI",
            Property::Editors => "Editors",
            Property::FilePath => "File Path",
            Property::FullCitation => "Full Citation",
            Property::InTextCitation => "In-Text Citation",
            Property::ItemType => "Item Type",
            Property::ShortTitle => "Short Title",
            Property::Tags => "Tags",
            Property::Title => "Title",
            Property::Url => "URL",
            Property::Year => "Year",
            Property::ZoteroUri => "Zotero URI",
        }
    }

    async fn value(self, item: &WoteroItem) -> Value {
        match self {
            Property::Abstract => rich_text(item.abstract_note().as_deref()),
            Property::Authors => rich_text(Some(&item.authors().join("\n"))),
            Property::Date => rich_text(item.date().as_deref()),
            Property::Doi => optional(item.doi()),
            Property::Editors => rich_text(Some(&item.editors().join("\n"))),
            Property::FilePath => rich_text(item.file_path().await.as_deref()),
            Property::FullCitation => {
                let citation = item.full_citation().await.unwrap_or_else(|| item.title());
                rich_text(Some(&citation))
            }
            Property::InTextCitation => {
                let citation = item.in_text_citation().await.unwrap_or_else(|| item.title());
                rich_text(Some(&citation))
            }
            Property::ItemType => Value::String(item.item_type()),
            Property::ShortTitle => rich_text(item.short_title().as_deref()),
            Property::Tags => rich_text(Some(&item.tags().join("\n"))),
            Property::Title => rich_text(Some(&item.title())),
            Property::Url => optional(item.url()),
            Property::Year => optional(item.year().map(|year| year.to_string())),
            Property::ZoteroUri => Value::String(item.uri()),
        }
    }
}

fn optional(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}

/// Maps a record onto the fields of one database.
pub struct RecordBuilder {
    schema: Arc<Schema>,
    title_format: PageTitleFormat,
}

impl RecordBuilder {
    pub fn new(schema: Arc<Schema>, title_format: PageTitleFormat) -> Self {
        RecordBuilder {
            schema,
            title_format,
        }
    }

    /// Properties this database declares, in definition order.
    pub fn declared(&self) -> impl Iterator<Item = Property> + '_ {
        Property::ALL
            .into_iter()
            .filter(|property| self.schema.contains(property.name()))
    }

    pub async fn build(&self, item: &WoteroItem) -> RecordFields {
        let mut fields = RecordFields::new();
        let title = item.build_title(self.title_format).await;
        fields.insert(TITLE_FIELD.to_string(), rich_text(Some(&title)));

        for property in self.declared() {
            fields.insert(property.name().to_string(), property.value(item).await);
        }

        fields
    }
}
