//! Hover card drawn as a DOM overlay above the canvas.

use viewer::tooltip::{Tooltip, TooltipContent};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlCanvasElement, HtmlElement};

const LINE_CLASSES: [&str; 4] = ["globe-tooltip-city", "globe-tooltip-time", "globe-tooltip-offset", "globe-tooltip-date"];

/// Card text, top to bottom.
pub fn tooltip_lines(content: &TooltipContent) -> [String; 4] {
    let city = match &content.country_code {
        Some(code) => format!("{}, {}", content.city, code),
        None => content.city.clone(),
    };
    [
        city,
        content.time.local_time.clone(),
        format!("{} ({})", content.time.offset_label, content.time.zone_name()),
        content.time.date.clone(),
    ]
}

pub struct TooltipOverlay {
    root: HtmlElement,
    lines: Vec<HtmlElement>,
    shown: Option<Tooltip>,
}

impl TooltipOverlay {
    /// Inserts a hidden card next to `canvas`. Its parent is expected to be
    /// the positioning context.
    pub fn attach(document: &Document, canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let root = create_div(document)?;
        root.set_class_name("globe-tooltip");
        root.set_attribute("role", "tooltip")?;
        let style = root.style();
        style.set_property("position", "absolute")?;
        style.set_property("pointer-events", "none")?;
        style.set_property("box-sizing", "border-box")?;
        style.set_property("display", "none")?;

        let mut lines = Vec::with_capacity(LINE_CLASSES.len());
        for class in LINE_CLASSES {
            let line = create_div(document)?;
            line.set_class_name(class);
            root.append_child(&line)?;
            lines.push(line);
        }

        let parent = canvas
            .parent_element()
            .ok_or_else(|| JsValue::from_str("canvas has no parent element"))?;
        parent.append_child(&root)?;
        Ok(Self {
            root,
            lines,
            shown: None,
        })
    }

    /// Shows `tooltip`, or hides the card for `None`. Unchanged cards are
    /// not touched.
    pub fn update(&mut self, tooltip: Option<Tooltip>) -> Result<(), JsValue> {
        if self.shown == tooltip {
            return Ok(());
        }
        let style = self.root.style();
        match &tooltip {
            Some(t) => {
                for (el, text) in self.lines.iter().zip(tooltip_lines(&t.content)) {
                    el.set_text_content(Some(&text));
                }
                style.set_property("left", &format!("{}px", t.card.min[0]))?;
                style.set_property("top", &format!("{}px", t.card.min[1]))?;
                style.set_property("width", &format!("{}px", t.card.width()))?;
                style.set_property("min-height", &format!("{}px", t.card.height()))?;
                style.set_property("display", "block")?;
            }
            None => style.set_property("display", "none")?,
        }
        self.shown = tooltip;
        Ok(())
    }

    pub fn remove(self) {
        self.root.remove();
    }
}

fn create_div(document: &Document) -> Result<HtmlElement, JsValue> {
    document
        .create_element("div")?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str("div is not an HtmlElement"))
}
