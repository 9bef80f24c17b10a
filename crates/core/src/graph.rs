//! Pure transformation functions for Microsoft Graph OneNote API responses
//!
//! This module contains zero I/O operations and is fully testable with fixture data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default Microsoft Graph API base URL
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

// ============================================================================
// Domain Models (Input from API)
// ============================================================================

/// Paginated collection envelope returned by every Graph list endpoint
#[derive(Debug, Deserialize, Clone)]
pub struct GraphCollection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default, rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Notebook response from API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotebookResponse {
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "lastModifiedDateTime", default)]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Section response from API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SectionResponse {
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

/// Section group response from API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SectionGroupResponse {
    pub id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
}

/// Page metadata response from API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PageResponse {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "createdDateTime", default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(rename = "lastModifiedDateTime", default)]
    pub last_modified: Option<DateTime<Utc>>,
}

// ============================================================================
// Output Models (Domain Model)
// ============================================================================

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Notebook {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub display_name: String,
    /// Names of the enclosing section groups, outermost first
    pub group_path: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<Page>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub created: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl Page {
    /// Timestamp used for date prefixes: creation time, falling back to the last modification
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.created.or(self.last_modified)
    }
}

/// Section group as seen while walking a notebook
#[derive(Debug, Clone, PartialEq)]
pub struct SectionGroup {
    pub id: String,
    pub display_name: String,
    pub group_path: Vec<String>,
}

// ============================================================================
// Pure Transformation Functions
// ============================================================================

fn display_name_or(name: Option<String>, fallback: &str) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn transform_notebooks(notebooks: Vec<NotebookResponse>) -> Vec<Notebook> {
    notebooks
        .into_iter()
        .map(|nb| Notebook {
            display_name: display_name_or(nb.display_name, &nb.id),
            id: nb.id,
            last_modified: nb.last_modified,
            sections: Vec::new(),
        })
        .collect()
}

/// Convert section responses, tagging them with the section group path they were listed under
pub fn transform_sections(sections: Vec<SectionResponse>, group_path: &[String]) -> Vec<Section> {
    sections
        .into_iter()
        .map(|s| Section {
            display_name: display_name_or(s.display_name, &s.id),
            id: s.id,
            group_path: group_path.to_vec(),
            pages: Vec::new(),
        })
        .collect()
}

pub fn transform_section_groups(
    groups: Vec<SectionGroupResponse>,
    parent_path: &[String],
) -> Vec<SectionGroup> {
    groups
        .into_iter()
        .map(|g| {
            let display_name = display_name_or(g.display_name, &g.id);
            let mut group_path = parent_path.to_vec();
            group_path.push(display_name.clone());
            SectionGroup {
                id: g.id,
                display_name,
                group_path,
            }
        })
        .collect()
}

pub fn transform_pages(pages: Vec<PageResponse>) -> Vec<Page> {
    pages
        .into_iter()
        .map(|p| Page {
            title: p
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            id: p.id,
            created: p.created,
            last_modified: p.last_modified,
        })
        .collect()
}

/// Sort pages by creation date, oldest first. Pages without a timestamp go last, in listing order.
pub fn sort_pages_by_created(pages: &mut [Page]) {
    pages.sort_by(|a, b| match (a.timestamp(), b.timestamp()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

// ============================================================================
// Endpoint builders
// ============================================================================

pub fn notebooks_url(base: &str) -> String {
    format!("{}/me/onenote/notebooks", base.trim_end_matches('/'))
}

pub fn notebook_sections_url(base: &str, notebook_id: &str) -> String {
    format!(
        "{}/me/onenote/notebooks/{notebook_id}/sections",
        base.trim_end_matches('/')
    )
}

pub fn notebook_section_groups_url(base: &str, notebook_id: &str) -> String {
    format!(
        "{}/me/onenote/notebooks/{notebook_id}/sectionGroups",
        base.trim_end_matches('/')
    )
}

pub fn group_sections_url(base: &str, group_id: &str) -> String {
    format!(
        "{}/me/onenote/sectionGroups/{group_id}/sections",
        base.trim_end_matches('/')
    )
}

pub fn group_section_groups_url(base: &str, group_id: &str) -> String {
    format!(
        "{}/me/onenote/sectionGroups/{group_id}/sectionGroups",
        base.trim_end_matches('/')
    )
}

pub fn section_pages_url(base: &str, section_id: &str) -> String {
    format!(
        "{}/me/onenote/sections/{section_id}/pages?$top=100",
        base.trim_end_matches('/')
    )
}

pub fn page_content_url(base: &str, page_id: &str) -> String {
    format!(
        "{}/me/onenote/pages/{page_id}/content",
        base.trim_end_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn page(id: &str, created: Option<DateTime<Utc>>) -> Page {
        Page {
            id: id.to_string(),
            title: id.to_string(),
            created,
            last_modified: None,
        }
    }

    #[test]
    fn test_collection_deserializes_next_link() {
        let json = r#"{
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users('x')/onenote/notebooks",
            "value": [{"id": "1-abc", "displayName": "Work"}],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/me/onenote/notebooks?$skip=20"
        }"#;
        let collection: GraphCollection<NotebookResponse> = serde_json::from_str(json).unwrap();
        assert_eq!(collection.value.len(), 1);
        assert_eq!(
            collection.next_link.as_deref(),
            Some("https://graph.microsoft.com/v1.0/me/onenote/notebooks?$skip=20")
        );
    }

    #[test]
    fn test_collection_without_value() {
        let collection: GraphCollection<PageResponse> = serde_json::from_str("{}").unwrap();
        assert!(collection.value.is_empty());
        assert!(collection.next_link.is_none());
    }

    #[test]
    fn test_transform_pages_parses_timestamps() {
        let json = r#"[{
            "id": "0-1",
            "title": "Trip Plan",
            "createdDateTime": "2023-05-01T08:30:00.123Z",
            "lastModifiedDateTime": "2023-05-02T10:00:00Z"
        }]"#;
        let pages = transform_pages(serde_json::from_str(json).unwrap());
        assert_eq!(pages[0].title, "Trip Plan");
        assert_eq!(
            pages[0].timestamp().unwrap().date_naive(),
            chrono::NaiveDate::from_ymd_opt(2023, 5, 1).unwrap()
        );
    }

    #[test]
    fn test_transform_pages_untitled() {
        let json = r#"[{"id": "a", "title": null}, {"id": "b", "title": "   "}, {"id": "c"}]"#;
        let pages = transform_pages(serde_json::from_str(json).unwrap());
        assert!(pages.iter().all(|p| p.title == "Untitled"));
    }

    #[test]
    fn test_timestamp_falls_back_to_last_modified() {
        let modified = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let p = Page {
            last_modified: Some(modified),
            ..page("x", None)
        };
        assert_eq!(p.timestamp(), Some(modified));
    }

    #[test]
    fn test_sort_pages_by_created() {
        let early = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let mut pages = vec![page("none", None), page("late", Some(late)), page("early", Some(early))];
        sort_pages_by_created(&mut pages);
        let ids: Vec<_> = pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "none"]);
    }

    #[test]
    fn test_section_groups_extend_path() {
        let groups = vec![SectionGroupResponse {
            id: "g1".to_string(),
            display_name: Some("Archive".to_string()),
        }];
        let parent = vec!["Old".to_string()];
        let out = transform_section_groups(groups, &parent);
        assert_eq!(out[0].group_path, vec!["Old".to_string(), "Archive".to_string()]);

        let sections = transform_sections(
            vec![SectionResponse {
                id: "s1".to_string(),
                display_name: None,
            }],
            &out[0].group_path,
        );
        assert_eq!(sections[0].display_name, "s1");
        assert_eq!(sections[0].group_path.len(), 2);
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        assert_eq!(
            page_content_url("https://graph.microsoft.com/v1.0/", "p1"),
            "https://graph.microsoft.com/v1.0/me/onenote/pages/p1/content"
        );
        assert_eq!(
            section_pages_url(GRAPH_API_BASE, "s1"),
            "https://graph.microsoft.com/v1.0/me/onenote/sections/s1/pages?$top=100"
        );
    }
}
