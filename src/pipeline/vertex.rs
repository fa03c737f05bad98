//! Vertex attribute model and perspective-correct interpolation.
//!
//! A [`Vertex`] carries a clip-space position, an optional write-once
//! screen-space position and a small bag of named attributes. Each attribute
//! is tagged with an [`Interpolation`] mode that decides how [`Vertex::lerp`]
//! treats it.
//!
//! Perspective correction works by storage, not by lookup: the moment the
//! screen-space position is written, every `Smooth` attribute is multiplied by
//! `1/w` in place. From then on a plain screen-space lerp of the stored value
//! and of `1/w` (the depth reciprocal) gives the two halves of the
//! perspective-correct quotient, and readers divide them back out.

use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};

use crate::error::VertexError;

/// How an attribute behaves when two vertices are interpolated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Never interpolated; the value of the first vertex is copied.
    Flat,
    /// Plain linear interpolation in screen space.
    NoPerspective,
    /// Perspective-correct interpolation.
    Smooth,
}

/// Closed set of attribute value shapes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl AttributeValue {
    /// Interpolate towards `other`.
    ///
    /// # Panics
    /// Panics when the two values have different shapes; attribute layouts
    /// are fixed by the shader that wrote them.
    #[inline]
    fn lerp(self, other: Self, alpha: f32) -> Self {
        let inv = 1.0 - alpha;
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => Self::Float(a * inv + b * alpha),
            (Self::Vec2(a), Self::Vec2(b)) => Self::Vec2(a * inv + b * alpha),
            (Self::Vec3(a), Self::Vec3(b)) => Self::Vec3(a * inv + b * alpha),
            (Self::Vec4(a), Self::Vec4(b)) => Self::Vec4(a * inv + b * alpha),
            (a, b) => panic!("cannot interpolate attribute {a:?} with {b:?}"),
        }
    }

    #[inline]
    fn scale(self, s: f32) -> Self {
        match self {
            Self::Float(v) => Self::Float(v * s),
            Self::Vec2(v) => Self::Vec2(v * s),
            Self::Vec3(v) => Self::Vec3(v * s),
            Self::Vec4(v) => Self::Vec4(v * s),
        }
    }

    pub fn as_float(self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec2(self) -> Option<Vec2> {
        match self {
            Self::Vec2(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3(self) -> Option<Vec3> {
        match self {
            Self::Vec3(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec4(self) -> Option<Vec4> {
        match self {
            Self::Vec4(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<Vec2> for AttributeValue {
    fn from(v: Vec2) -> Self {
        Self::Vec2(v)
    }
}

impl From<Vec3> for AttributeValue {
    fn from(v: Vec3) -> Self {
        Self::Vec3(v)
    }
}

impl From<Vec4> for AttributeValue {
    fn from(v: Vec4) -> Self {
        Self::Vec4(v)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Attribute {
    mode: Interpolation,
    // Pre-multiplied by the depth reciprocal for `Smooth` attributes once the
    // screen-space position is known.
    stored: AttributeValue,
}

#[derive(Clone, Debug)]
pub struct Vertex {
    clip_space_position: Option<Vec4>,
    screen_space_position: Option<Vec3>,
    depth_reciprocal: f32,
    // Vertices carry a handful of attributes, a linear scan beats hashing.
    attributes: Vec<(Arc<str>, Attribute)>,
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn mix<T>(a: T, b: T, alpha: f32) -> T
where
    T: std::ops::Mul<f32, Output = T> + std::ops::Add<Output = T>,
{
    a * (1.0 - alpha) + b * alpha
}

impl Vertex {
    pub fn new() -> Self {
        Self {
            clip_space_position: None,
            screen_space_position: None,
            depth_reciprocal: 1.0,
            attributes: Vec::new(),
        }
    }

    /// Vertex with only a clip-space position.
    pub fn from_clip_position(position: Vec4) -> Self {
        let mut vertex = Self::new();
        vertex.clip_space_position = Some(position);
        vertex
    }

    /// Vertex already in screen space with `w = 1`, as used by overlays and
    /// directly rasterized geometry. It has no clip-space position, so the
    /// clipper discards it.
    pub fn from_screen_position(position: Vec3) -> Self {
        Self {
            clip_space_position: None,
            screen_space_position: Some(position),
            depth_reciprocal: 1.0,
            attributes: Vec::new(),
        }
    }

    #[inline]
    pub fn clip_space_position(&self) -> Option<Vec4> {
        self.clip_space_position
    }

    #[inline]
    pub fn set_clip_space_position(&mut self, position: Vec4) {
        self.clip_space_position = Some(position);
    }

    #[inline]
    pub fn screen_space_position(&self) -> Option<Vec3> {
        self.screen_space_position
    }

    /// Write the screen-space position and pre-divide every `Smooth`
    /// attribute by the clip-space `w`.
    ///
    /// The position is write-once. Calling this a second time, or before the
    /// clip-space position exists, is a contract violation.
    pub fn set_screen_space_position(&mut self, position: Vec3) -> Result<(), VertexError> {
        if self.screen_space_position.is_some() {
            return Err(VertexError::ScreenSpaceAlreadySet);
        }
        let clip = self
            .clip_space_position
            .ok_or(VertexError::ClipSpaceNotSet)?;

        let reciprocal = 1.0 / clip.w;
        self.depth_reciprocal = reciprocal;
        for (_, attribute) in &mut self.attributes {
            if attribute.mode == Interpolation::Smooth {
                attribute.stored = attribute.stored.scale(reciprocal);
            }
        }
        self.screen_space_position = Some(position);
        Ok(())
    }

    /// `1 / w` of the clip-space position, or 1 until the screen-space
    /// position is set.
    #[inline]
    pub fn depth_reciprocal(&self) -> f32 {
        self.depth_reciprocal
    }

    /// Insert or replace an attribute.
    pub fn set_attribute(
        &mut self,
        name: &str,
        value: impl Into<AttributeValue>,
        mode: Interpolation,
    ) {
        let value = value.into();
        let stored = if mode == Interpolation::Smooth && self.screen_space_position.is_some() {
            value.scale(self.depth_reciprocal)
        } else {
            value
        };
        let attribute = Attribute { mode, stored };

        match self.attributes.iter_mut().find(|(key, _)| &**key == name) {
            Some((_, slot)) => *slot = attribute,
            None => self.attributes.push((Arc::from(name), attribute)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        let position = self.attributes.iter().position(|(key, _)| &**key == name)?;
        let value = self.read(&self.attributes[position].1);
        self.attributes.swap_remove(position);
        Some(value)
    }

    #[inline]
    fn find(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(key, _)| &**key == name)
            .map(|(_, attribute)| attribute)
    }

    #[inline]
    fn read(&self, attribute: &Attribute) -> AttributeValue {
        if attribute.mode == Interpolation::Smooth && self.screen_space_position.is_some() {
            attribute.stored.scale(1.0 / self.depth_reciprocal)
        } else {
            attribute.stored
        }
    }

    /// Attribute value as the shader wrote it, with any perspective
    /// pre-division undone.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.find(name).map(|attribute| self.read(attribute))
    }

    pub fn interpolation(&self, name: &str) -> Option<Interpolation> {
        self.find(name).map(|attribute| attribute.mode)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(key, _)| &**key)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.attribute(name).and_then(AttributeValue::as_float)
    }

    pub fn vec2(&self, name: &str) -> Option<Vec2> {
        self.attribute(name).and_then(AttributeValue::as_vec2)
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        self.attribute(name).and_then(AttributeValue::as_vec3)
    }

    pub fn vec4(&self, name: &str) -> Option<Vec4> {
        self.attribute(name).and_then(AttributeValue::as_vec4)
    }

    /// Overwrite every `Flat` attribute with the value `source` carries,
    /// adding the ones this vertex lacks.
    pub fn copy_flat_attributes(&mut self, source: &Vertex) {
        for (key, attribute) in &source.attributes {
            if attribute.mode != Interpolation::Flat {
                continue;
            }
            match self.attributes.iter_mut().find(|(own, _)| own == key) {
                Some((_, slot)) => *slot = *attribute,
                None => self.attributes.push((Arc::clone(key), *attribute)),
            }
        }
    }

    /// Whether every `Flat` attribute of `source` is present here with the
    /// same value.
    pub fn shares_flat_attributes(&self, source: &Vertex) -> bool {
        source
            .attributes
            .iter()
            .filter(|(_, attribute)| attribute.mode == Interpolation::Flat)
            .all(|(key, attribute)| self.find(key) == Some(attribute))
    }

    /// Interpolate towards `target`.
    ///
    /// Positions and the depth reciprocal are interpolated linearly. `Flat`
    /// attributes keep the value of `self`; every other attribute is
    /// interpolated against the attribute of the same name on `target`.
    /// `alpha` is not clamped, clipping extrapolates past the endpoints.
    ///
    /// # Panics
    /// Panics when `target` lacks one of the non-flat attributes of `self`,
    /// when an attribute changes shape, or when only one of the two vertices
    /// has been projected to screen space.
    pub fn lerp(&self, target: &Vertex, alpha: f32) -> Vertex {
        assert_eq!(
            self.screen_space_position.is_some(),
            target.screen_space_position.is_some(),
            "cannot interpolate a projected vertex with an unprojected one"
        );

        let clip_space_position = match (self.clip_space_position, target.clip_space_position) {
            (Some(a), Some(b)) => Some(mix(a, b, alpha)),
            _ => None,
        };
        let screen_space_position = match (self.screen_space_position, target.screen_space_position)
        {
            (Some(a), Some(b)) => Some(mix(a, b, alpha)),
            _ => None,
        };

        let attributes = self
            .attributes
            .iter()
            .map(|(key, attribute)| {
                let stored = match attribute.mode {
                    Interpolation::Flat => attribute.stored,
                    Interpolation::NoPerspective | Interpolation::Smooth => {
                        let other = target.find(key).unwrap_or_else(|| {
                            panic!("attribute `{key}` is missing on the interpolation target")
                        });
                        attribute.stored.lerp(other.stored, alpha)
                    }
                };
                (Arc::clone(key), Attribute { mode: attribute.mode, stored })
            })
            .collect();

        Vertex {
            clip_space_position,
            screen_space_position,
            depth_reciprocal: mix(self.depth_reciprocal, target.depth_reciprocal, alpha),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_space_position_is_write_once() {
        let mut v = Vertex::from_clip_position(Vec4::new(0.0, 0.0, 0.0, 2.0));
        assert_eq!(v.set_screen_space_position(Vec3::ZERO), Ok(()));
        assert_eq!(
            v.set_screen_space_position(Vec3::ONE),
            Err(VertexError::ScreenSpaceAlreadySet)
        );
        assert_eq!(v.screen_space_position(), Some(Vec3::ZERO));
    }

    #[test]
    fn screen_space_before_clip_space_is_rejected() {
        let mut v = Vertex::new();
        assert_eq!(
            v.set_screen_space_position(Vec3::ZERO),
            Err(VertexError::ClipSpaceNotSet)
        );
        assert!(v.screen_space_position().is_none());
    }

    #[test]
    fn smooth_attributes_read_back_unchanged_after_projection() {
        let mut v = Vertex::from_clip_position(Vec4::new(1.0, 2.0, 3.0, 4.0));
        v.set_attribute("uv", Vec2::new(0.5, 0.25), Interpolation::Smooth);
        v.set_attribute("shade", 0.75, Interpolation::NoPerspective);
        v.set_screen_space_position(Vec3::new(10.0, 10.0, 0.5)).unwrap();

        assert_eq!(v.depth_reciprocal(), 0.25);
        assert_eq!(v.vec2("uv"), Some(Vec2::new(0.5, 0.25)));
        assert_eq!(v.float("shade"), Some(0.75));
        // Stored pre-divided by w
        assert_eq!(v.attributes[0].1.stored, AttributeValue::Vec2(Vec2::new(0.125, 0.0625)));
    }

    #[test]
    fn smooth_attribute_written_after_projection_is_premultiplied() {
        let mut v = Vertex::from_clip_position(Vec4::new(0.0, 0.0, 0.0, 2.0));
        v.set_screen_space_position(Vec3::ZERO).unwrap();
        v.set_attribute("fog", 4.0, Interpolation::Smooth);
        assert_eq!(v.float("fog"), Some(4.0));
        assert_eq!(v.attributes[0].1.stored, AttributeValue::Float(2.0));
    }

    #[test]
    fn flat_attributes_copy_the_first_vertex() {
        let mut a = Vertex::from_clip_position(Vec4::W);
        let mut b = Vertex::from_clip_position(Vec4::W);
        a.set_attribute("id", 1.0, Interpolation::Flat);
        b.set_attribute("id", 9.0, Interpolation::Flat);

        assert_eq!(a.lerp(&b, 0.7).float("id"), Some(1.0));
        assert_eq!(b.lerp(&a, 0.7).float("id"), Some(9.0));
    }

    #[test]
    fn copied_flat_attributes_replace_and_extend() {
        let mut source = Vertex::new();
        source.set_attribute("id", 1.0, Interpolation::Flat);
        source.set_attribute("normal", Vec3::Y, Interpolation::Flat);
        source.set_attribute("uv", Vec2::ONE, Interpolation::Smooth);
        let mut v = Vertex::new();
        v.set_attribute("id", 7.0, Interpolation::Flat);
        v.set_attribute("uv", Vec2::ZERO, Interpolation::Smooth);
        assert!(!v.shares_flat_attributes(&source));

        v.copy_flat_attributes(&source);
        assert!(v.shares_flat_attributes(&source));
        assert_eq!(v.float("id"), Some(1.0));
        assert_eq!(v.vec3("normal"), Some(Vec3::Y));
        // Smooth attributes are left alone
        assert_eq!(v.vec2("uv"), Some(Vec2::ZERO));
    }

    #[test]
    fn screen_space_vertex_has_no_clip_position() {
        let v = Vertex::from_screen_position(Vec3::new(4.0, 5.0, 0.5));
        assert_eq!(v.clip_space_position(), None);
        assert_eq!(v.screen_space_position(), Some(Vec3::new(4.0, 5.0, 0.5)));
    }

    #[test]
    fn lerp_extrapolates_outside_unit_range() {
        let a = Vertex::from_clip_position(Vec4::new(0.0, 0.0, 0.0, 1.0));
        let b = Vertex::from_clip_position(Vec4::new(2.0, 0.0, 0.0, 1.0));
        let c = a.lerp(&b, 1.5);
        assert_eq!(c.clip_space_position(), Some(Vec4::new(3.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn replacing_an_attribute_keeps_a_single_entry() {
        let mut v = Vertex::new();
        v.set_attribute("color", Vec4::ONE, Interpolation::Smooth);
        v.set_attribute("color", Vec4::ZERO, Interpolation::NoPerspective);
        assert_eq!(v.attribute_names().count(), 1);
        assert_eq!(v.interpolation("color"), Some(Interpolation::NoPerspective));
        assert_eq!(v.remove_attribute("color"), Some(AttributeValue::Vec4(Vec4::ZERO)));
        assert!(!v.has_attribute("color"));
    }

    #[test]
    #[should_panic(expected = "missing on the interpolation target")]
    fn lerp_with_mismatched_keys_panics() {
        let mut a = Vertex::from_clip_position(Vec4::W);
        let b = Vertex::from_clip_position(Vec4::W);
        a.set_attribute("normal", Vec3::Y, Interpolation::Smooth);
        let _ = a.lerp(&b, 0.5);
    }
}
