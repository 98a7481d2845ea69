//! Sub-layout attached to each migrated link type.

use crate::defaults::{
    ARIA_LABEL_ELEMENT, CLASSES_ELEMENT, CUSTOM_ATTRIBUTES_ELEMENT, LAYOUT_ADVANCED_TAB,
    LAYOUT_CONTENT_TAB, LAYOUT_HALF_WIDTH, LINK_FIELD_ELEMENT, LINK_TEXT_ELEMENT,
    LINK_TITLE_ELEMENT,
};
use crate::models::{FieldLayout, LayoutElement, LayoutTab};

fn native(element_type: &str, width: Option<u8>) -> LayoutElement {
    LayoutElement::Native {
        element_type: element_type.to_string(),
        width,
    }
}

/// Build the default two-tab layout of a link type.
///
/// "Content" holds the link input and, when `include_text`, the link text
/// input, both at half width. "Advanced" holds title (optional), classes,
/// custom attributes and aria label (optional), in that order.
pub fn build_default_layout(
    include_text: bool,
    enable_title: bool,
    enable_aria_label: bool,
) -> FieldLayout {
    let mut content = vec![native(LINK_FIELD_ELEMENT, Some(LAYOUT_HALF_WIDTH))];
    if include_text {
        content.push(native(LINK_TEXT_ELEMENT, Some(LAYOUT_HALF_WIDTH)));
    }

    let mut advanced = Vec::with_capacity(4);
    if enable_title {
        advanced.push(native(LINK_TITLE_ELEMENT, None));
    }
    advanced.push(native(CLASSES_ELEMENT, None));
    advanced.push(native(CUSTOM_ATTRIBUTES_ELEMENT, None));
    if enable_aria_label {
        advanced.push(native(ARIA_LABEL_ELEMENT, None));
    }

    FieldLayout {
        tabs: vec![
            LayoutTab {
                name: LAYOUT_CONTENT_TAB.to_string(),
                elements: content,
            },
            LayoutTab {
                name: LAYOUT_ADVANCED_TAB.to_string(),
                elements: advanced,
            },
        ],
    }
}
