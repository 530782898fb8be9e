use crate::config::ChartConfig;
use crate::error::{ChartError, ChartResult};
use crate::scale::{extent, format_grouped, mean, ColorScale, LinearScale, Rgb};
use crate::types::{DataRow, Viewport, ViewportGeometry};
use std::fmt::{Display, Write};
use tracing::{debug, warn};

const TICK_COUNT: usize = 10;
const TICK_SIZE: f64 = 6.0;
const TICK_PADDING: f64 = 3.0;

/// A node of the SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Display) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Numeric attribute, if present and parseable.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get_attr(name).and_then(|v| v.parse().ok())
    }

    /// Depth-first search for every descendant with the given tag.
    pub fn find_all(&self, tag: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect(tag, &mut found);
        found
    }

    fn collect<'a>(&'a self, tag: &str, found: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.tag == tag {
                found.push(child);
            }
            child.collect(tag, found);
        }
    }

    fn write_svg(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        for (name, value) in &self.attrs {
            let _ = write!(out, " {}=\"{}\"", name, escape_xml(value));
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape_xml(text));
        }
        for child in &self.children {
            child.write_svg(out);
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

/// The root `<svg>` of one chart instance.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingSurface {
    viewport: Viewport,
    root: Element,
}

impl DrawingSurface {
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn circles(&self) -> Vec<&Element> {
        self.root.find_all("circle")
    }

    /// State abbreviation labels, the elements carrying tooltips.
    pub fn labels(&self) -> Vec<&Element> {
        self.root
            .find_all("text")
            .into_iter()
            .filter(|t| t.get_attr("class") == Some("stateText"))
            .collect()
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        self.root.write_svg(&mut out);
        out
    }
}

/// Scales derived from one dataset and viewport.
#[derive(Debug, Clone)]
pub struct ChartScales {
    pub x: LinearScale,
    pub y: LinearScale,
    pub color: ColorScale,
}

impl ChartScales {
    pub fn new(
        rows: &[DataRow],
        geometry: &ViewportGeometry,
        config: &ChartConfig,
    ) -> ChartResult<Self> {
        let (pov_min, pov_max) = extent(rows.iter().map(|r| r.poverty))
            .ok_or(ChartError::EmptyDomain("poverty"))?;
        let (hc_min, hc_max) = extent(rows.iter().map(|r| r.healthcare))
            .ok_or(ChartError::EmptyDomain("healthcare"))?;
        let (ob_min, ob_max) = extent(rows.iter().map(|r| r.obesity))
            .ok_or(ChartError::EmptyDomain("obesity"))?;
        let ob_mean =
            mean(rows.iter().map(|r| r.obesity)).ok_or(ChartError::EmptyDomain("obesity"))?;

        let [low, mid, high] = &config.colors;
        Ok(Self {
            x: LinearScale::new((pov_min - 1.0, pov_max + 1.0), (0.0, geometry.chart_width)),
            y: LinearScale::new((hc_min - 1.0, hc_max + 1.0), (geometry.chart_height, 0.0)),
            color: ColorScale::new(
                [ob_min, ob_mean, ob_max],
                [Rgb::from_hex(low), Rgb::from_hex(mid), Rgb::from_hex(high)],
            ),
        })
    }
}

pub fn radius(income: f64, divisor: f64) -> f64 {
    income * income / divisor
}

/// Tooltip markup shown when a state label is clicked.
pub fn tooltip_html(row: &DataRow) -> String {
    format!(
        "{}<hr>${}<hr>Obesity Index: {}, Smoking Index: {}",
        escape_xml(&row.state),
        format_grouped(row.income, 0),
        row.obesity,
        row.smokes
    )
}

/// Builds a complete chart for the given viewport. Pure: the same inputs
/// always give the same surface.
pub fn render_chart(
    viewport: Viewport,
    rows: &[DataRow],
    config: &ChartConfig,
) -> ChartResult<DrawingSurface> {
    let geometry = ViewportGeometry::new(viewport, config.margin);
    if !geometry.fits() {
        return Err(ChartError::ViewportTooSmall {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let scales = ChartScales::new(rows, &geometry, config)?;
    let margin = geometry.margin;

    let mut chart_group = Element::new("g")
        .attr("transform", format!("translate({}, {})", margin.left, margin.top));

    chart_group.push(
        axis_bottom(&scales.x).attr("transform", format!("translate(0, {})", geometry.chart_height)),
    );
    chart_group.push(axis_left(&scales.y));

    let [dx, dy] = config.label_offset;
    let mut circles = Vec::with_capacity(rows.len());
    let mut labels = Vec::with_capacity(rows.len());
    for row in rows {
        let cx = scales.x.apply(row.poverty);
        let cy = scales.y.apply(row.healthcare);
        let r = radius(row.income, config.radius_divisor);
        if !(cx.is_finite() && cy.is_finite() && r.is_finite()) {
            warn!("Skipping {} ({}): non-numeric poverty, healthcare or income", row.state, row.abbr);
            continue;
        }

        circles.push(
            Element::new("circle")
                .attr("class", "circle")
                .attr("cx", cx)
                .attr("cy", cy)
                .attr("r", r)
                .attr("fill", scales.color.apply(row.obesity))
                .attr("opacity", config.opacity)
                .attr("style", "stroke: black"),
        );
        labels.push(
            Element::new("text")
                .attr("class", "stateText")
                .attr("x", cx + dx)
                .attr("y", cy + dy)
                .attr("data-tooltip", tooltip_html(row))
                .text(row.abbr.clone()),
        );
    }
    debug!("Drawing {} of {} rows", circles.len(), rows.len());
    chart_group.children.extend(circles);
    chart_group.children.extend(labels);

    chart_group.push(
        Element::new("text")
            .attr("transform", "rotate(-90)")
            .attr("y", 0.0 - margin.left + 15.0)
            .attr("x", 0.0 - geometry.chart_height / 2.0)
            .attr("class", "axisText")
            .text(config.y_title.clone()),
    );
    chart_group.push(
        Element::new("text")
            .attr("y", geometry.chart_height + margin.top + 5.0)
            .attr("x", geometry.chart_width / 2.0)
            .attr("class", "axisText")
            .text(config.x_title.clone()),
    );

    let [offset_top, offset_left] = config.tooltip_offset;
    let root = Element::new("svg")
        .attr("xmlns", "http://www.w3.org/2000/svg")
        .attr("height", viewport.height)
        .attr("width", viewport.width)
        .attr("data-tooltip-offset", format!("{},{}", offset_top, offset_left))
        .child(chart_group);

    Ok(DrawingSurface { viewport, root })
}

fn axis_bottom(scale: &LinearScale) -> Element {
    let (r0, r1) = scale.range();
    let format = scale.tick_format(TICK_COUNT);
    let mut axis = axis_group("middle").child(
        Element::new("path")
            .attr("class", "domain")
            .attr("stroke", "currentColor")
            .attr(
                "d",
                format!("M{},{}V0.5H{}V{}", r0 + 0.5, TICK_SIZE, r1 + 0.5, TICK_SIZE),
            ),
    );
    for tick in scale.ticks(TICK_COUNT) {
        axis.push(
            Element::new("g")
                .attr("class", "tick")
                .attr("opacity", 1)
                .attr("transform", format!("translate({},0)", scale.apply(tick) + 0.5))
                .child(
                    Element::new("line")
                        .attr("stroke", "currentColor")
                        .attr("y2", TICK_SIZE),
                )
                .child(
                    Element::new("text")
                        .attr("fill", "currentColor")
                        .attr("y", TICK_SIZE + TICK_PADDING)
                        .attr("dy", "0.71em")
                        .text(format(tick)),
                ),
        );
    }
    axis
}

fn axis_left(scale: &LinearScale) -> Element {
    let (r0, r1) = scale.range();
    let format = scale.tick_format(TICK_COUNT);
    let mut axis = axis_group("end").child(
        Element::new("path")
            .attr("class", "domain")
            .attr("stroke", "currentColor")
            .attr(
                "d",
                format!("M{},{}H0.5V{}H{}", -TICK_SIZE, r0 + 0.5, r1 + 0.5, -TICK_SIZE),
            ),
    );
    for tick in scale.ticks(TICK_COUNT) {
        axis.push(
            Element::new("g")
                .attr("class", "tick")
                .attr("opacity", 1)
                .attr("transform", format!("translate(0,{})", scale.apply(tick) + 0.5))
                .child(
                    Element::new("line")
                        .attr("stroke", "currentColor")
                        .attr("x2", -TICK_SIZE),
                )
                .child(
                    Element::new("text")
                        .attr("fill", "currentColor")
                        .attr("x", -(TICK_SIZE + TICK_PADDING))
                        .attr("dy", "0.32em")
                        .text(format(tick)),
                ),
        );
    }
    axis
}

fn axis_group(anchor: &str) -> Element {
    Element::new("g")
        .attr("fill", "none")
        .attr("font-size", 10)
        .attr("font-family", "sans-serif")
        .attr("text-anchor", anchor)
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
