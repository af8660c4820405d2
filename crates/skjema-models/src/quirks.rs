//! Per-app layout patches. Some production layouts shipped with
//! misconfigurations (most often duplicate component ids) that the
//! hierarchy generator would otherwise reject. Each quirk verifies the
//! layout still looks exactly as expected before patching it, so a fixed
//! layout stops being patched automatically.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuirkError {
    #[error("page '{0}' not found or has no layout array")]
    MissingPage(String),
    #[error("page '{page}' has no component at index {index}")]
    MissingComponent { page: String, index: usize },
    #[error("expected component id '{expected}' at {page}[{index}], found '{found}'")]
    UnexpectedId {
        page: String,
        index: usize,
        expected: String,
        found: String,
    },
}

struct QuirkDef {
    verify_and_apply: fn(&mut Value) -> Result<(), QuirkError>,
    log_messages: &'static [&'static str],
}

/// Applies any quirk registered for `org/app/layout_set_id` to the raw
/// layout-set JSON. Returns the input unchanged when no quirk matches
/// or when verification fails.
#[must_use]
pub fn apply_quirks(layouts: &Value, org: &str, app: &str, layout_set_id: &str) -> Value {
    let key = format!("{org}/{app}/{layout_set_id}");
    let Some(quirk) = quirk_for(&key) else {
        return layouts.clone();
    };

    let mut patched = layouts.clone();
    match (quirk.verify_and_apply)(&mut patched) {
        Ok(()) => {
            for message in quirk.log_messages {
                tracing::warn!(key = %key, "layout quirk applied: {message}");
            }
            patched
        }
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "layout quirk verification failed, leaving layout untouched");
            layouts.clone()
        }
    }
}

fn quirk_for(key: &str) -> Option<QuirkDef> {
    match key {
        "digdir/tilskudd-dig-delt-komp/form" => Some(QuirkDef {
            verify_and_apply: |layouts| {
                expect_id(layouts, "03Description", 1, "descriptionHeader")?;
                expect_id(layouts, "pdfReceipt", 7, "descriptionHeader")?;
                set_id(layouts, "pdfReceipt", 7, "descriptionHeaderPdfSummary")
            },
            log_messages: &[
                "renamed duplicate id 'descriptionHeader' in 'pdfReceipt' to 'descriptionHeaderPdfSummary'",
            ],
        }),
        "dsb/bekymring-forbrukertjenester/form" => Some(QuirkDef {
            verify_and_apply: |layouts| {
                for page in [
                    "01Introduction",
                    "02ContactInfo",
                    "03ProductInformation",
                    "04Incident",
                    "05Remarks",
                    "06Attachments",
                ] {
                    let last = last_index(layouts, page)?;
                    expect_id(layouts, page, last, "navButtons")?;
                    set_id(layouts, page, last, &format!("navButtons{page}"))?;
                }
                Ok(())
            },
            log_messages: &["renamed duplicate id 'navButtons' per page"],
        }),
        _ => None,
    }
}

fn page_layout<'v>(layouts: &'v mut Value, page: &str) -> Result<&'v mut Vec<Value>, QuirkError> {
    layouts
        .get_mut(page)
        .and_then(|p| p.get_mut("data"))
        .and_then(|d| d.get_mut("layout"))
        .and_then(Value::as_array_mut)
        .ok_or_else(|| QuirkError::MissingPage(page.to_string()))
}

fn last_index(layouts: &mut Value, page: &str) -> Result<usize, QuirkError> {
    let layout = page_layout(layouts, page)?;
    layout
        .len()
        .checked_sub(1)
        .ok_or_else(|| QuirkError::MissingComponent {
            page: page.to_string(),
            index: 0,
        })
}

fn expect_id(layouts: &mut Value, page: &str, index: usize, expected: &str) -> Result<(), QuirkError> {
    let layout = page_layout(layouts, page)?;
    let found = layout
        .get(index)
        .and_then(|c| c.get("id"))
        .and_then(Value::as_str)
        .ok_or_else(|| QuirkError::MissingComponent {
            page: page.to_string(),
            index,
        })?;
    if found == expected {
        Ok(())
    } else {
        Err(QuirkError::UnexpectedId {
            page: page.to_string(),
            index,
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

fn set_id(layouts: &mut Value, page: &str, index: usize, id: &str) -> Result<(), QuirkError> {
    let layout = page_layout(layouts, page)?;
    let component = layout
        .get_mut(index)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| QuirkError::MissingComponent {
            page: page.to_string(),
            index,
        })?;
    component.insert("id".to_string(), Value::String(id.to_string()));
    Ok(())
}
