//! HTML serialization of a [`Picture`] using maud.
//!
//! The fallback `<img>` always carries `alt` (empty by default). Every other
//! `<img>` attribute is written only when set to a non-empty value.
//!
//! An empty media condition produces a `<source>` without `media`, where
//! older `<picture>` templates wrote `media=""`. Browsers treat an absent and
//! an empty media list alike (the source always matches), so the output is
//! equivalent; the [`PictureMarkupPlan`](crate::markup::PictureMarkupPlan)
//! still carries the empty condition verbatim.

use crate::picture::Picture;
use maud::{Markup, html};
use serde::Serialize;

/// Pass-through attributes of the fallback `<img>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageAttributes {
    pub alt: String,
    pub title: Option<String>,
    pub loading: Option<String>,
    pub decoding: Option<String>,
    pub ismap: Option<String>,
    pub usemap: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

pub fn render_picture(picture: &Picture) -> Markup {
    let focus_area = picture
        .focus_area
        .as_ref()
        .and_then(|area| serde_json::to_string(area).ok());
    let attrs = &picture.attributes;
    let fallback = picture.plan.fallback.as_ref();

    html! {
        picture data-focus-area=[focus_area] {
            @for source in &picture.plan.sources {
                source
                    media=[(!source.media_condition.is_empty()).then_some(&source.media_condition)]
                    srcset=(source.srcset);
            }
            img
                src=[fallback.map(|f| &f.url)]
                width=[fallback.map(|f| f.width)]
                height=[fallback.map(|f| f.height)]
                alt=(attrs.alt)
                title=[non_empty(&attrs.title)]
                loading=[non_empty(&attrs.loading)]
                decoding=[non_empty(&attrs.decoding)]
                ismap=[non_empty(&attrs.ismap)]
                usemap=[non_empty(&attrs.usemap)];
        }
    }
}
