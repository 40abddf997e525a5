//! Table geometry and pocket tuning.
//!
//! A [`TableConfig`] is built once per session and never changes afterwards.
//! All lengths are simulation-world units (meters) with the origin at the table center.

use serde::Deserialize;
use thiserror::Error;

/// Reasons a table configuration is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be a positive finite number, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} must be a non-negative finite number, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{axis} rail thickness {rail} leaves no play area (half-dimension {half})")]
    RailTooThick { axis: char, rail: f32, half: f32 },

    #[error("pocket radius {pocket_radius} is smaller than the ball radius {ball_radius}")]
    PocketTooSmall { pocket_radius: f32, ball_radius: f32 },

    #[error("play area {width}x{height} cannot hold a ball of diameter {ball_diameter}")]
    PlayAreaTooSmall {
        width: f32,
        height: f32,
        ball_diameter: f32,
    },

    #[error("invalid table config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

const DEFAULT_POCKET_RADIUS_SCALE: f32 = 1.9;
const DEFAULT_POCKET_INSET_SCALE: f32 = 1.0;
const DEFAULT_POCKET_FUNNEL_SCALE: f32 = 0.6;

/// Immutable table geometry snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    table_w: f32,
    table_h: f32,
    rail_x: f32,
    rail_y: f32,
    ball_radius: f32,
    pocket_radius_scale: f32,
    pocket_inset_scale_x: f32,
    pocket_inset_scale_y: f32,
    pocket_funnel_scale: f32,
}

impl TableConfig {
    /// Start a builder with the required dimensions; pocket tuning takes defaults.
    pub fn builder(table_w: f32, table_h: f32, rail_x: f32, rail_y: f32, ball_radius: f32) -> TableConfigBuilder {
        TableConfigBuilder {
            table_w,
            table_h,
            rail_x,
            rail_y,
            ball_radius,
            pocket_radius_scale: None,
            pocket_inset_scale_x: None,
            pocket_inset_scale_y: None,
            pocket_funnel_scale: None,
        }
    }

    /// Nine-foot table: 2.54 x 1.27 overall, 6 cm rails, regulation 57.15 mm balls.
    pub fn standard() -> Self {
        Self {
            table_w: 2.54,
            table_h: 1.27,
            rail_x: 0.06,
            rail_y: 0.06,
            ball_radius: 0.028575,
            pocket_radius_scale: DEFAULT_POCKET_RADIUS_SCALE,
            pocket_inset_scale_x: DEFAULT_POCKET_INSET_SCALE,
            pocket_inset_scale_y: DEFAULT_POCKET_INSET_SCALE,
            pocket_funnel_scale: DEFAULT_POCKET_FUNNEL_SCALE,
        }
    }

    /// Parse and validate a builder serialized as JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let builder: TableConfigBuilder = serde_json::from_str(json)?;
        builder.build()
    }

    pub fn table_w(&self) -> f32 {
        self.table_w
    }

    pub fn table_h(&self) -> f32 {
        self.table_h
    }

    pub fn rail_x(&self) -> f32 {
        self.rail_x
    }

    pub fn rail_y(&self) -> f32 {
        self.rail_y
    }

    pub fn ball_radius(&self) -> f32 {
        self.ball_radius
    }

    pub fn pocket_radius(&self) -> f32 {
        self.ball_radius * self.pocket_radius_scale
    }

    pub fn pocket_inset_x(&self) -> f32 {
        self.rail_x * self.pocket_inset_scale_x
    }

    pub fn pocket_inset_y(&self) -> f32 {
        self.rail_y * self.pocket_inset_scale_y
    }

    /// How far a pocket mouth reaches past the cushion line.
    pub fn pocket_funnel(&self) -> f32 {
        self.ball_radius * self.pocket_funnel_scale
    }

    pub fn half_w(&self) -> f32 {
        self.table_w * 0.5
    }

    pub fn half_h(&self) -> f32 {
        self.table_h * 0.5
    }
}

/// Builder for [`TableConfig`]. Also the JSON shape accepted by [`TableConfig::from_json`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfigBuilder {
    table_w: f32,
    table_h: f32,
    rail_x: f32,
    rail_y: f32,
    ball_radius: f32,
    #[serde(default)]
    pocket_radius_scale: Option<f32>,
    #[serde(default)]
    pocket_inset_scale_x: Option<f32>,
    #[serde(default)]
    pocket_inset_scale_y: Option<f32>,
    #[serde(default)]
    pocket_funnel_scale: Option<f32>,
}

impl TableConfigBuilder {
    pub fn pocket_radius_scale(mut self, scale: f32) -> Self {
        self.pocket_radius_scale = Some(scale);
        self
    }

    pub fn pocket_inset_scale_x(mut self, scale: f32) -> Self {
        self.pocket_inset_scale_x = Some(scale);
        self
    }

    pub fn pocket_inset_scale_y(mut self, scale: f32) -> Self {
        self.pocket_inset_scale_y = Some(scale);
        self
    }

    pub fn pocket_funnel_scale(mut self, scale: f32) -> Self {
        self.pocket_funnel_scale = Some(scale);
        self
    }

    /// Validate and freeze. Degenerate geometry is rejected here rather than
    /// discovered later as balls escaping the table.
    pub fn build(self) -> Result<TableConfig, ConfigError> {
        let config = TableConfig {
            table_w: self.table_w,
            table_h: self.table_h,
            rail_x: self.rail_x,
            rail_y: self.rail_y,
            ball_radius: self.ball_radius,
            pocket_radius_scale: self.pocket_radius_scale.unwrap_or(DEFAULT_POCKET_RADIUS_SCALE),
            pocket_inset_scale_x: self.pocket_inset_scale_x.unwrap_or(DEFAULT_POCKET_INSET_SCALE),
            pocket_inset_scale_y: self.pocket_inset_scale_y.unwrap_or(DEFAULT_POCKET_INSET_SCALE),
            pocket_funnel_scale: self.pocket_funnel_scale.unwrap_or(DEFAULT_POCKET_FUNNEL_SCALE),
        };
        validate(&config).map_err(|err| {
            log::warn!("Rejected table config: {}", err);
            err
        })?;
        Ok(config)
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

fn validate(c: &TableConfig) -> Result<(), ConfigError> {
    positive("tableW", c.table_w)?;
    positive("tableH", c.table_h)?;
    positive("railX", c.rail_x)?;
    positive("railY", c.rail_y)?;
    positive("ballRadius", c.ball_radius)?;
    positive("pocketRadiusScale", c.pocket_radius_scale)?;
    non_negative("pocketInsetScaleX", c.pocket_inset_scale_x)?;
    non_negative("pocketInsetScaleY", c.pocket_inset_scale_y)?;
    non_negative("pocketFunnelScale", c.pocket_funnel_scale)?;

    if c.rail_x >= c.half_w() {
        return Err(ConfigError::RailTooThick { axis: 'x', rail: c.rail_x, half: c.half_w() });
    }
    if c.rail_y >= c.half_h() {
        return Err(ConfigError::RailTooThick { axis: 'y', rail: c.rail_y, half: c.half_h() });
    }
    if c.pocket_radius() < c.ball_radius {
        return Err(ConfigError::PocketTooSmall {
            pocket_radius: c.pocket_radius(),
            ball_radius: c.ball_radius,
        });
    }
    let width = c.table_w - 2.0 * c.rail_x;
    let height = c.table_h - 2.0 * c.rail_y;
    let ball_diameter = 2.0 * c.ball_radius;
    if width < ball_diameter || height < ball_diameter {
        return Err(ConfigError::PlayAreaTooSmall { width, height, ball_diameter });
    }
    Ok(())
}
