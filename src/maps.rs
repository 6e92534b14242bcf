//! Occurrence density map tiles.

use anyhow::{Result, anyhow, bail};
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::gbif::Section;
use crate::http::Params;

const PRIMARY_PARAMS_MESSAGE: &str = "Only one primary search parameter is permitted: taxonKey, datasetKey, networkKey, publishingOrg, publishingCountry.";

/// Tile encoding and resolution, appended to the tile path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileFormat {
    /// Mapbox vector tile.
    #[default]
    Mvt,
    /// 256px raster for legacy clients.
    HalfPng,
    /// 512px raster.
    Png1x,
    /// 1024px raster.
    Png2x,
    /// 2048px raster.
    Png3x,
    /// 4096px raster.
    Png4x,
}

impl TileFormat {
    const ALL: [TileFormat; 6] = [
        TileFormat::Mvt,
        TileFormat::HalfPng,
        TileFormat::Png1x,
        TileFormat::Png2x,
        TileFormat::Png3x,
        TileFormat::Png4x,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TileFormat::Mvt => ".mvt",
            TileFormat::HalfPng => "@Hx.png",
            TileFormat::Png1x => "@1x.png",
            TileFormat::Png2x => "@2x.png",
            TileFormat::Png3x => "@3x.png",
            TileFormat::Png4x => "@4x.png",
        }
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, TileFormat::Mvt)
    }
}

impl fmt::Display for TileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TileFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                anyhow!(
                    "Unknown tile format '{}', expected one of .mvt, @Hx.png, @1x.png, @2x.png, @3x.png, @4x.png",
                    s
                )
            })
    }
}

/// Which occurrences a map shows.
///
/// At most one of `taxon_key`, `dataset_key`, `network_key`, `publishing_org`
/// and `publishing_country` may be set; `country` can be combined with any
/// of them.
#[derive(Debug, Clone, Default)]
pub struct MapQuery {
    pub basis_of_record: Option<String>,
    /// Year or `from,to` range.
    pub year: Option<String>,
    pub country: Option<String>,
    pub taxon_key: Option<i64>,
    pub dataset_key: Option<String>,
    pub publishing_org: Option<String>,
    pub publishing_country: Option<String>,
    pub network_key: Option<String>,
}

impl MapQuery {
    /// Fails unless at most one primary parameter is set.
    pub fn validate(&self) -> Result<()> {
        let primary = [
            self.taxon_key.is_some(),
            self.dataset_key.is_some(),
            self.network_key.is_some(),
            self.publishing_org.is_some(),
            self.publishing_country.is_some(),
        ];
        if primary.into_iter().filter(|set| *set).count() > 1 {
            bail!(PRIMARY_PARAMS_MESSAGE);
        }
        Ok(())
    }

    fn to_params(&self) -> Params {
        Params::new()
            .opt("basisOfRecord", self.basis_of_record.as_ref())
            .opt("year", self.year.as_ref())
            .opt("country", self.country.as_ref())
            .opt("taxonKey", self.taxon_key)
            .opt("datasetKey", self.dataset_key.as_ref())
            .opt("publishingOrg", self.publishing_org.as_ref())
            .opt("publishingCountry", self.publishing_country.as_ref())
            .opt("networkKey", self.network_key.as_ref())
    }
}

/// Rendering options for a tile.
#[derive(Debug, Clone, Default)]
pub struct TileOptions {
    /// Projection, e.g. `EPSG:3857`.
    pub srs: Option<String>,
    pub verbose: Option<bool>,
    /// `hex` or `square` binning.
    pub bin: Option<String>,
    pub hex_per_tile: Option<u32>,
    pub square_size: Option<u32>,
    /// Raster style such as `classic.point`; ignored for vector tiles.
    pub style: Option<String>,
}

impl TileOptions {
    fn to_params(&self) -> Params {
        Params::new()
            .opt("srs", self.srs.as_ref())
            .opt("verbose", self.verbose)
            .opt("bin", self.bin.as_ref())
            .opt("hexPerTile", self.hex_per_tile)
            .opt("squareSize", self.square_size)
            .opt("style", self.style.as_ref())
    }
}

/// Tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl Tile {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

/// Density tiles served from the v2 API.
pub struct Maps {
    pub(crate) section: Section,
}

impl Maps {
    pub(crate) fn new(section: Section) -> Self {
        Self { section }
    }

    /// Precalculated density tile.
    pub async fn density_tile(
        &self,
        tile: Tile,
        format: TileFormat,
        options: &TileOptions,
        query: &MapQuery,
    ) -> Result<Bytes> {
        self.tile("density", tile, format, options, query).await
    }

    /// Tile computed on demand from an occurrence search.
    pub async fn adhoc_tile(
        &self,
        tile: Tile,
        format: TileFormat,
        options: &TileOptions,
        query: &MapQuery,
    ) -> Result<Bytes> {
        self.tile("adhoc", tile, format, options, query).await
    }

    /// Extent, year range and total count available for a density query.
    pub async fn density_summary(&self, query: &MapQuery) -> Result<Value> {
        query.validate()?;
        let summary = self
            .section
            .client
            .fetch_with_params(
                &self.section.url("density/capabilities.json"),
                &query.to_params(),
                None,
            )
            .await?;
        Ok(summary)
    }

    async fn tile(
        &self,
        kind: &str,
        tile: Tile,
        format: TileFormat,
        options: &TileOptions,
        query: &MapQuery,
    ) -> Result<Bytes> {
        query.validate()?;
        let resource = format!("{}/{}/{}/{}{}", kind, tile.z, tile.x, tile.y, format);
        let params = options.to_params().merge(query.to_params());
        let bytes = self
            .section
            .client
            .fetch_raw_with_params(&self.section.url(&resource), &params, None)
            .await?;
        Ok(bytes)
    }
}
