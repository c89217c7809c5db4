//! In-memory representation of an ISF drawing.
//!
//! The [`Drawing`] is the sole owner of everything a stream describes:
//! strokes, drawing attribute sets, metric tables, transformation matrices,
//! stroke descriptors and the custom GUID table. Strokes reference the
//! shared tables through index newtypes rather than pointers, so a
//! [`Stroke`] stays cheap to copy and the ownership graph stays acyclic.

use std::collections::BTreeMap;
use std::fmt;

use crate::tags::metric_property;
use crate::IsfError;

/// Fit the line segments between stroke points to Bezier curves when
/// rendering.
pub const FIT_TO_CURVE: u16 = 0x0001;
/// Ignore the pressure channel of this stroke.
pub const IGNORE_PRESSURE: u16 = 0x0004;
/// The stroke is a highlighter stroke.
pub const IS_HIGHLIGHTER: u16 = 0x0100;
/// The pen tip is a rectangle rather than a ball.
pub const IS_RECTANGLE: u16 = 0x0200;

/// Index of an [`AttributeSet`] owned by a [`Drawing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSetId(pub(crate) usize);

/// Index of a [`Metrics`] table owned by a [`Drawing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsId(pub(crate) usize);

/// Index of a [`Transform`] owned by a [`Drawing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformId(pub(crate) usize);

/// Index of a [`StrokeInfo`] owned by a [`Drawing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokeInfoId(pub(crate) usize);

impl AttributeSetId {
    pub fn index(self) -> usize {
        self.0
    }
}
impl MetricsId {
    pub fn index(self) -> usize {
        self.0
    }
}
impl TransformId {
    pub fn index(self) -> usize {
        self.0
    }
}
impl StrokeInfoId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single point within a stroke: ink-space coordinates plus the optional
/// pressure level of its packet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: i64,
    pub y: i64,
    pub pressure: Option<i64>,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Point {
        Point {
            x,
            y,
            pressure: None,
        }
    }

    pub fn with_pressure(x: i64, y: i64, pressure: i64) -> Point {
        Point {
            x,
            y,
            pressure: Some(pressure),
        }
    }
}

/// An RGBA color. The wire stores pen colors as `0x00BBGGRR` with the
/// transparency in a separate property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b, a: 255 }
    }
}

impl Default for Color {
    fn default() -> Color {
        Color::BLACK
    }
}

/// A two-dimensional size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Size {
        Size { width, height }
    }
}

/// Drawing attributes shared by one or more strokes: pen color, pen size in
/// pixels and a mask of stroke flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeSet {
    pub color: Color,
    pub pen_size: Size,
    pub flags: u16,
}

impl Default for AttributeSet {
    fn default() -> AttributeSet {
        AttributeSet {
            color: Color::BLACK,
            pen_size: Size::new(1.0, 1.0),
            flags: 0,
        }
    }
}

/// Units used for metric measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Unused,
    Default,
    Inch,
    Cm,
    Degree,
    Radian,
    Second,
    Pound,
    Gram,
}

impl MetricUnit {
    pub fn new(value: i8) -> MetricUnit {
        match value {
            -1 => MetricUnit::Unused,
            0 => MetricUnit::Default,
            1 => MetricUnit::Inch,
            2 => MetricUnit::Cm,
            3 => MetricUnit::Degree,
            4 => MetricUnit::Radian,
            5 => MetricUnit::Second,
            6 => MetricUnit::Pound,
            7 => MetricUnit::Gram,
            _ => MetricUnit::Default,
        }
    }

    pub fn wire_value(self) -> i8 {
        match self {
            MetricUnit::Unused => -1,
            MetricUnit::Default => 0,
            MetricUnit::Inch => 1,
            MetricUnit::Cm => 2,
            MetricUnit::Degree => 3,
            MetricUnit::Radian => 4,
            MetricUnit::Second => 5,
            MetricUnit::Pound => 6,
            MetricUnit::Gram => 7,
        }
    }
}

/// Value range, unit and resolution of one packet property channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub min: i64,
    pub max: i64,
    pub units: MetricUnit,
    pub resolution: f32,
}

impl Metric {
    pub fn new(min: i64, max: i64, units: MetricUnit, resolution: f32) -> Metric {
        Metric {
            min,
            max,
            units,
            resolution,
        }
    }

    fn unused() -> Metric {
        Metric::new(-1, -1, MetricUnit::Unused, -1.0)
    }
}

/// A table of metrics keyed by packet property id.
///
/// The default table is the compiled-in one below; a metric block read from
/// the stream overrides entries starting from these values.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub items: BTreeMap<u64, Metric>,
}

impl Default for Metrics {
    fn default() -> Metrics {
        let mut items = BTreeMap::new();

        items.insert(
            metric_property::X,
            Metric::new(0, 12699, MetricUnit::Cm, 1000.0),
        );
        items.insert(
            metric_property::Y,
            Metric::new(0, 9649, MetricUnit::Cm, 1000.0),
        );
        items.insert(
            metric_property::Z,
            Metric::new(-1023, 1023, MetricUnit::Cm, 1000.0),
        );
        items.insert(
            metric_property::PACKET_STATUS,
            Metric::new(0, 1023, MetricUnit::Default, 1.0),
        );
        items.insert(
            metric_property::TIMER_TICK,
            Metric::new(0, 1023, MetricUnit::Default, 1.0),
        );
        items.insert(
            metric_property::SERIAL_NUMBER,
            Metric::new(0, 1023, MetricUnit::Default, 1.0),
        );
        items.insert(
            metric_property::NORMAL_PRESSURE,
            Metric::new(0, 3600, MetricUnit::Degree, 10.0),
        );
        items.insert(
            metric_property::TANGENT_PRESSURE,
            Metric::new(0, 3600, MetricUnit::Degree, 10.0),
        );
        items.insert(
            metric_property::BUTTON_PRESSURE,
            Metric::new(0, 3600, MetricUnit::Degree, 10.0),
        );
        items.insert(
            metric_property::X_TILT_ORIENTATION,
            Metric::new(-900, 900, MetricUnit::Degree, 10.0),
        );
        items.insert(
            metric_property::Y_TILT_ORIENTATION,
            Metric::new(0, 3600, MetricUnit::Degree, 10.0),
        );
        items.insert(metric_property::AZIMUTH_ORIENTATION, Metric::unused());
        items.insert(metric_property::ALTITUDE_ORIENTATION, Metric::unused());
        items.insert(metric_property::TWIST_ORIENTATION, Metric::unused());
        items.insert(metric_property::PITCH_ROTATION, Metric::unused());
        items.insert(metric_property::ROLL_ROTATION, Metric::unused());
        items.insert(metric_property::YAW_ROTATION, Metric::unused());

        Metrics { items }
    }
}

/// A 2x3 affine transformation matrix.
///
/// A point maps as `(m11*x + m21*y + dx, m12*x + m22*y + dy)`. Scale
/// components arrive from the wire in HiMetric units and are stored here
/// already divided down to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub m11: f32,
    pub m12: f32,
    pub m21: f32,
    pub m22: f32,
    pub dx: f32,
    pub dy: f32,
}

impl Default for Transform {
    fn default() -> Transform {
        Transform {
            m11: 1.0,
            m12: 0.0,
            m21: 0.0,
            m22: 1.0,
            dx: 0.0,
            dy: 0.0,
        }
    }
}

impl Transform {
    pub fn scaling(sx: f32, sy: f32) -> Transform {
        Transform {
            m11: sx,
            m22: sy,
            ..Transform::default()
        }
    }

    pub fn translation(dx: f32, dy: f32) -> Transform {
        Transform {
            dx,
            dy,
            ..Transform::default()
        }
    }

    pub fn rotation(degrees: f32) -> Transform {
        let radians = degrees.to_radians();
        Transform {
            m11: radians.cos(),
            m12: radians.sin(),
            m21: -radians.sin(),
            m22: radians.cos(),
            dx: 0.0,
            dy: 0.0,
        }
    }

    pub fn map(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.m11 * x + self.m21 * y + self.dx,
            self.m12 * x + self.m22 * y + self.dy,
        )
    }

    pub fn is_translating(&self) -> bool {
        self.dx != 0.0 || self.dy != 0.0
    }

    pub fn is_scaling(&self) -> bool {
        self.m12 == 0.0 && self.m21 == 0.0 && (self.m11 != 1.0 || self.m22 != 1.0)
    }

    pub fn is_rotating(&self) -> bool {
        self.m12 != 0.0 || self.m21 != 0.0
    }
}

/// Which packet channels the strokes governed by this descriptor carry.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeInfo {
    pub has_x: bool,
    pub has_y: bool,
    pub has_pressure: bool,
    /// Raw packet property words of the descriptor that are not understood
    /// beyond implying extra channels.
    pub packet_properties: Vec<u64>,
}

impl Default for StrokeInfo {
    fn default() -> StrokeInfo {
        StrokeInfo {
            has_x: true,
            has_y: true,
            has_pressure: false,
            packet_properties: Vec::new(),
        }
    }
}

/// A 16-byte GUID registered by the stream's GUID table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guid(pub [u8; 16]);

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{{{:02X}{:02X}{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7], b[8], b[9], b[10], b[11], b[12],
            b[13], b[14], b[15]
        )
    }
}

/// An axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Rect {
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn united(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn adjusted(&self, dl: f32, dt: f32, dr: f32, db: f32) -> Rect {
        Rect {
            left: self.left + dl,
            top: self.top + dt,
            right: self.right + dr,
            bottom: self.bottom + db,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

/// An axis-aligned rectangle in ink-space units, as stored by the
/// `INK_SPACE_RECT` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InkRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

/// An ordered sequence of points sharing one set of drawing attributes,
/// metrics and transformation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stroke {
    points: Vec<Point>,

    attributes: Option<AttributeSetId>,
    metrics: Option<MetricsId>,
    transform: Option<TransformId>,
    info: Option<StrokeInfoId>,

    bounding_rect: Rect,
    has_pressure: bool,
}

impl Stroke {
    pub fn new() -> Stroke {
        Stroke::default()
    }

    pub fn from_points(points: Vec<Point>) -> Stroke {
        Stroke {
            points,
            ..Stroke::default()
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn attributes(&self) -> Option<AttributeSetId> {
        self.attributes
    }

    pub fn set_attributes(&mut self, id: Option<AttributeSetId>) {
        self.attributes = id;
    }

    pub fn metrics(&self) -> Option<MetricsId> {
        self.metrics
    }

    pub fn set_metrics(&mut self, id: Option<MetricsId>) {
        self.metrics = id;
    }

    pub fn transform(&self) -> Option<TransformId> {
        self.transform
    }

    pub fn set_transform(&mut self, id: Option<TransformId>) {
        self.transform = id;
    }

    pub fn info(&self) -> Option<StrokeInfoId> {
        self.info
    }

    pub fn set_info(&mut self, id: Option<StrokeInfoId>) {
        self.info = id;
    }

    pub fn bounding_rect(&self) -> Rect {
        self.bounding_rect
    }

    pub fn has_pressure(&self) -> bool {
        self.has_pressure
    }

    /// Recompute the cached bounding rectangle and the pressure flag.
    ///
    /// The rectangle is the smallest one containing every point after the
    /// stroke transformation, expanded by half the pen width on each side.
    /// A stroke without points keeps a zero-area rectangle.
    pub fn finalize(&mut self, pen_width: f32, transform: Option<&Transform>) {
        self.has_pressure = self.points.iter().any(|point| point.pressure.is_some());

        if self.points.is_empty() {
            self.bounding_rect = Rect::default();
            return;
        }

        let mut left = f32::MAX;
        let mut top = f32::MAX;
        let mut right = f32::MIN;
        let mut bottom = f32::MIN;

        for point in &self.points {
            let (x, y) = match transform {
                Some(matrix) => matrix.map(point.x as f32, point.y as f32),
                None => (point.x as f32, point.y as f32),
            };

            left = left.min(x);
            top = top.min(y);
            right = right.max(x);
            bottom = bottom.max(y);
        }

        let half_pen = pen_width / 2.0;
        self.bounding_rect =
            Rect::new(left, top, right, bottom).adjusted(-half_pen, -half_pen, half_pen, half_pen);
    }
}

/// A complete ISF drawing: the root owner of all strokes and shared tables.
///
/// A freshly constructed drawing is null; decoding or adding a stroke makes
/// it non-null. After decoding, structural changes go through
/// [`Drawing::add_stroke`], [`Drawing::delete_stroke`] and
/// [`Drawing::set_bounding_rect`], which keep the bounding rectangle and
/// maximum pen size up to date.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    strokes: Vec<Stroke>,
    attribute_sets: Vec<AttributeSet>,
    metrics: Vec<Metrics>,
    transforms: Vec<Transform>,
    stroke_infos: Vec<StrokeInfo>,
    guids: Vec<Guid>,
    max_guid: u64,

    error: Option<IsfError>,
    has_x_data: bool,
    has_y_data: bool,
    is_null: bool,

    canvas: Option<InkRect>,
    himetric_size: Option<(i64, i64)>,
    bounding_rect: Rect,
    max_pen_size: Size,
}

impl Default for Drawing {
    fn default() -> Drawing {
        Drawing::new()
    }
}

impl Drawing {
    /// Construct an empty, null drawing.
    pub fn new() -> Drawing {
        Drawing {
            strokes: Vec::new(),
            attribute_sets: Vec::new(),
            metrics: Vec::new(),
            transforms: Vec::new(),
            stroke_infos: Vec::new(),
            guids: Vec::new(),
            max_guid: 0,
            error: None,
            has_x_data: true,
            has_y_data: true,
            is_null: true,
            canvas: None,
            himetric_size: None,
            bounding_rect: Rect::default(),
            max_pen_size: Size::default(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.is_null
    }

    /// The parse error recorded on this drawing, if any. A drawing with an
    /// error may hold partial content for diagnostic inspection.
    pub fn error(&self) -> Option<IsfError> {
        self.error
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn stroke(&self, index: usize) -> Option<&Stroke> {
        self.strokes.get(index)
    }

    pub fn attribute_sets(&self) -> &[AttributeSet] {
        &self.attribute_sets
    }

    pub fn attribute_set(&self, id: AttributeSetId) -> Option<&AttributeSet> {
        self.attribute_sets.get(id.0)
    }

    pub fn metrics_tables(&self) -> &[Metrics] {
        &self.metrics
    }

    pub fn metrics(&self, id: MetricsId) -> Option<&Metrics> {
        self.metrics.get(id.0)
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    pub fn transform(&self, id: TransformId) -> Option<&Transform> {
        self.transforms.get(id.0)
    }

    pub fn stroke_infos(&self) -> &[StrokeInfo] {
        &self.stroke_infos
    }

    pub fn stroke_info(&self, id: StrokeInfoId) -> Option<&StrokeInfo> {
        self.stroke_infos.get(id.0)
    }

    pub fn guids(&self) -> &[Guid] {
        &self.guids
    }

    /// Highest custom tag id addressable through the GUID table, or zero
    /// when the table is empty.
    pub fn max_guid(&self) -> u64 {
        self.max_guid
    }

    pub fn has_x_data(&self) -> bool {
        self.has_x_data
    }

    pub fn has_y_data(&self) -> bool {
        self.has_y_data
    }

    pub fn canvas(&self) -> Option<InkRect> {
        self.canvas
    }

    pub fn set_canvas(&mut self, canvas: InkRect) {
        self.canvas = Some(canvas);
    }

    /// Declared dimensions of the drawing in HiMetric units.
    pub fn himetric_size(&self) -> Option<(i64, i64)> {
        self.himetric_size
    }

    pub fn set_himetric_size(&mut self, width: i64, height: i64) {
        self.himetric_size = Some((width, height));
    }

    pub fn bounding_rect(&self) -> Rect {
        self.bounding_rect
    }

    pub fn set_bounding_rect(&mut self, rect: Rect) {
        self.bounding_rect = rect;
    }

    /// Largest pen size used by any attribute set, in pixels.
    pub fn max_pen_size(&self) -> Size {
        self.max_pen_size
    }

    pub fn add_attribute_set(&mut self, set: AttributeSet) -> AttributeSetId {
        self.attribute_sets.push(set);
        AttributeSetId(self.attribute_sets.len() - 1)
    }

    pub fn add_metrics(&mut self, metrics: Metrics) -> MetricsId {
        self.metrics.push(metrics);
        MetricsId(self.metrics.len() - 1)
    }

    pub fn add_transform(&mut self, transform: Transform) -> TransformId {
        self.transforms.push(transform);
        TransformId(self.transforms.len() - 1)
    }

    pub fn add_stroke_info(&mut self, info: StrokeInfo) -> StrokeInfoId {
        self.stroke_infos.push(info);
        StrokeInfoId(self.stroke_infos.len() - 1)
    }

    pub(crate) fn register_guid(&mut self, guid: Guid) {
        self.guids.push(guid);
        self.max_guid = 99 + self.guids.len() as u64;
    }

    pub(crate) fn set_error(&mut self, error: IsfError) {
        self.error = Some(error);
    }

    pub(crate) fn set_null(&mut self, is_null: bool) {
        self.is_null = is_null;
    }

    pub(crate) fn set_has_x_data(&mut self, has_x: bool) {
        self.has_x_data = has_x;
    }

    pub(crate) fn set_has_y_data(&mut self, has_y: bool) {
        self.has_y_data = has_y;
    }

    pub(crate) fn set_max_pen_size(&mut self, size: Size) {
        self.max_pen_size = size;
    }

    /// Append an already finalized stroke without recomputing the drawing
    /// geometry; the parser maintains it incrementally.
    pub(crate) fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
    }

    /// Pen width in pixels effective for a stroke, falling back to the
    /// default attribute set.
    pub(crate) fn effective_pen_width(&self, stroke: &Stroke) -> f32 {
        stroke
            .attributes()
            .and_then(|id| self.attribute_set(id))
            .map(|set| set.pen_size.width)
            .unwrap_or_else(|| AttributeSet::default().pen_size.width)
    }

    /// Add a stroke, finalizing it against its referenced tables. Returns
    /// the stroke index.
    pub fn add_stroke(&mut self, mut stroke: Stroke) -> usize {
        let pen_width = self.effective_pen_width(&stroke);
        let transform = stroke.transform().and_then(|id| self.transform(id)).copied();
        stroke.finalize(pen_width, transform.as_ref());

        self.strokes.push(stroke);
        self.is_null = false;

        self.update_bounding_rect();

        self.strokes.len() - 1
    }

    /// Remove a stroke by index. Returns false when the index is out of
    /// range.
    pub fn delete_stroke(&mut self, index: usize) -> bool {
        if index >= self.strokes.len() {
            return false;
        }

        self.strokes.remove(index);
        self.update_bounding_rect();

        true
    }

    /// Recompute the maximum pen size and the bounding rectangle as the
    /// union of every stroke rectangle, padded by the maximum pen size
    /// plus one on each side.
    pub fn update_bounding_rect(&mut self) {
        let mut max_pen = Size::default();
        for set in &self.attribute_sets {
            max_pen.width = max_pen.width.max(set.pen_size.width);
            max_pen.height = max_pen.height.max(set.pen_size.height);
        }
        for stroke in &self.strokes {
            let width = self.effective_pen_width(stroke);
            max_pen.width = max_pen.width.max(width);
        }
        self.max_pen_size = max_pen;

        let mut union: Option<Rect> = None;
        for stroke in &self.strokes {
            if stroke.points().is_empty() {
                continue;
            }
            let rect = stroke.bounding_rect();
            union = Some(match union {
                Some(current) => current.united(&rect),
                None => rect,
            });
        }

        self.bounding_rect = match union {
            Some(rect) => rect.adjusted(
                -(max_pen.width + 1.0),
                -(max_pen.height + 1.0),
                max_pen.width + 1.0,
                max_pen.height + 1.0,
            ),
            None => Rect::default(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stroke_has_zero_area_rect() {
        let mut stroke = Stroke::new();
        stroke.finalize(4.0, None);
        assert_eq!(stroke.bounding_rect(), Rect::default());
        assert!(!stroke.has_pressure());
    }

    #[test]
    fn test_stroke_bounding_rect_includes_pen() {
        let mut stroke =
            Stroke::from_points(vec![Point::new(10, 20), Point::new(30, 25), Point::new(15, 5)]);
        stroke.finalize(4.0, None);

        assert_eq!(stroke.bounding_rect(), Rect::new(8.0, 3.0, 32.0, 27.0));
    }

    #[test]
    fn test_stroke_bounding_rect_applies_transform() {
        let mut stroke = Stroke::from_points(vec![Point::new(10, 10), Point::new(20, 20)]);
        let transform = Transform::scaling(2.0, 3.0);
        stroke.finalize(0.0, Some(&transform));

        assert_eq!(stroke.bounding_rect(), Rect::new(20.0, 30.0, 40.0, 60.0));
    }

    #[test]
    fn test_stroke_pressure_detection() {
        let mut stroke = Stroke::from_points(vec![
            Point::new(0, 0),
            Point::with_pressure(1, 1, 512),
        ]);
        stroke.finalize(1.0, None);
        assert!(stroke.has_pressure());
    }

    #[test]
    fn test_drawing_starts_null() {
        let drawing = Drawing::new();
        assert!(drawing.is_null());
        assert_eq!(drawing.error(), None);
        assert!(drawing.strokes().is_empty());
    }

    #[test]
    fn test_add_stroke_updates_geometry() {
        let mut drawing = Drawing::new();
        let attrs = drawing.add_attribute_set(AttributeSet {
            pen_size: Size::new(2.0, 2.0),
            ..AttributeSet::default()
        });

        let mut stroke = Stroke::from_points(vec![Point::new(0, 0), Point::new(100, 50)]);
        stroke.set_attributes(Some(attrs));
        drawing.add_stroke(stroke);

        assert!(!drawing.is_null());

        // Stroke rect is padded by half the pen, the drawing by the
        // maximum pen size plus one.
        let rect = drawing.bounding_rect();
        assert_eq!(rect.left, -4.0);
        assert_eq!(rect.top, -4.0);
        assert_eq!(rect.right, 104.0);
        assert_eq!(rect.bottom, 54.0);

        for point in drawing.strokes()[0].points() {
            assert!(rect.contains(point.x as f32, point.y as f32));
        }
    }

    #[test]
    fn test_delete_stroke() {
        let mut drawing = Drawing::new();
        drawing.add_stroke(Stroke::from_points(vec![Point::new(0, 0)]));
        drawing.add_stroke(Stroke::from_points(vec![Point::new(9, 9)]));

        assert!(!drawing.delete_stroke(5));
        assert!(drawing.delete_stroke(0));
        assert_eq!(drawing.strokes().len(), 1);
        assert_eq!(drawing.strokes()[0].points()[0], Point::new(9, 9));
    }

    #[test]
    fn test_default_metrics_table() {
        let metrics = Metrics::default();
        let x = metrics.items.get(&metric_property::X).unwrap();
        assert_eq!(x.max, 12699);
        assert_eq!(x.units, MetricUnit::Cm);

        let yaw = metrics.items.get(&metric_property::YAW_ROTATION).unwrap();
        assert_eq!(yaw.units, MetricUnit::Unused);
    }

    #[test]
    fn test_guid_display() {
        let guid = Guid([
            0x96, 0xE9, 0xB2, 0x29, 0xB6, 0x57, 0xDA, 0x4F, 0xBF, 0xFD, 0xF5, 0x4D, 0xBA, 0x4C,
            0x35, 0xF9,
        ]);
        assert_eq!(
            guid.to_string(),
            "{96E9B229-B657-DA4F-BFFD-F54DBA4C35F9}"
        );
    }
}
