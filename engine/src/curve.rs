use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Smoothstep between neighbouring keys, flat tangents at every key.
    Smooth,
}

/// Response curve used to reshape normalized heights before they are scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CurveDef")]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
    interpolation: Interpolation,
}

#[derive(Deserialize)]
struct CurveDef {
    keys: Vec<CurveKey>,
    #[serde(default)]
    interpolation: Interpolation,
}

impl From<CurveDef> for HeightCurve {
    fn from(def: CurveDef) -> Self { HeightCurve::new(def.keys, def.interpolation) }
}

impl Default for HeightCurve {
    fn default() -> Self { Self::linear() }
}

impl HeightCurve {
    pub fn new(mut keys: Vec<CurveKey>, interpolation: Interpolation) -> Self {
        keys.retain(|k| k.time.is_finite() && k.value.is_finite());
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys, interpolation }
    }

    pub fn from_points(points: &[(f32, f32)], interpolation: Interpolation) -> Self {
        let keys = points.iter().map(|&(time, value)| CurveKey { time, value }).collect();
        Self::new(keys, interpolation)
    }

    /// Identity on [0, 1].
    pub fn linear() -> Self {
        Self::from_points(&[(0.0, 0.0), (1.0, 1.0)], Interpolation::Linear)
    }

    /// Flat below `sea_level`, identity-like above it.
    pub fn flat_below(sea_level: f32) -> Self {
        Self::from_points(&[(0.0, 0.0), (sea_level, 0.0), (1.0, 1.0)], Interpolation::Linear)
    }

    pub fn keys(&self) -> &[CurveKey] { &self.keys }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // first key with time > t; t is strictly inside the key range here
        let hi = self.keys.partition_point(|k| k.time <= t);
        let (a, b) = (self.keys[hi - 1], self.keys[hi]);
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.value;
        }
        let mut u = (t - a.time) / span;
        if self.interpolation == Interpolation::Smooth {
            u = u * u * (3.0 - 2.0 * u);
        }
        a.value + (b.value - a.value) * u
    }
}
