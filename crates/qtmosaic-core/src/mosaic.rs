//! One mosaic run, from inputs to the prepared canvas.
//!
//! ```text
//! validate options ─► input georefs ─► output projection
//!        │
//!        ▼
//! condition inputs (parallel) ─► normalization range ─► place inputs (parallel)
//!        │
//!        ▼
//! insert (single writer, input order) ─► resolve bbox ─► prepare ─► MosaicOutput
//! ```
//!
//! Any error aborts the whole run; there is no partial output.

use crate::composite::{
    insert_wrapped, BlendMode, ImageComposite, PreparedComposite, ProgressCallback,
};
use crate::config::MosaicOptions;
use crate::geometry::BBox2i;
use crate::georef::{GeoReference, GeoTransform};
use crate::mode::ModeConfig;
use crate::reproject::{LinearRescale, PlacedImage, ReprojectionStage, StageConfig, ValueRange};
use crate::resolution::{
    global_output_georef, make_input_georef, total_resolution, OutputProjection,
};
use crate::resolve::resolve_canvas_bbox;
use crate::source::{ChannelType, ImageSource, MaskedImage, PixelFormat};
use crate::MosaicError;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

/// One input of the mosaic.
pub struct InputImage {
    pub source: Box<dyn ImageSource>,
    /// Georeference read from the file, if it has one.
    pub georef: Option<Arc<dyn GeoReference>>,
    /// Per-input overrides of the corresponding [`MosaicOptions`] fields.
    pub nodata: Option<f32>,
    pub pixel_scale: Option<f32>,
    pub pixel_offset: Option<f32>,
}

impl InputImage {
    pub fn new(source: Box<dyn ImageSource>) -> Self {
        Self {
            source,
            georef: None,
            nodata: None,
            pixel_scale: None,
            pixel_offset: None,
        }
    }

    pub fn with_georef(mut self, georef: impl GeoReference + 'static) -> Self {
        self.georef = Some(Arc::new(georef));
        self
    }

    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

/// Everything the tile generator needs.
#[derive(Debug)]
pub struct MosaicOutput {
    pub composite: PreparedComposite,
    /// Bbox the canvas was prepared over, in output pixels.
    pub bbox: BBox2i,
    /// Extent of actual data inside the canvas, origin at `bbox`'s corner.
    pub data_bbox: BBox2i,
    pub mode_config: ModeConfig,
    pub total_resolution: u32,
    pub xres: u32,
    pub yres: u32,
    pub tile_size: u32,
    pub file_type: String,
}

/// Build the mosaic of `inputs`.
///
/// `output_georef` replaces the mode's built-in output projection; it is
/// required for modes without one (Google Maps). It is ignored when
/// georeferencing is off ([`crate::mode::Mode::None`] or a `none` projection
/// override), which composes a single image without projection work.
pub fn build_mosaic(
    inputs: &[InputImage],
    options: &MosaicOptions,
    output_georef: Option<Box<dyn GeoReference>>,
    progress: &dyn ProgressCallback,
) -> Result<MosaicOutput, MosaicError> {
    options.validate(inputs.len())?;

    let (format, channel) = working_layout(inputs, options);
    let base = StageConfig {
        format,
        channel,
        nodata: options.nodata,
        rescale: LinearRescale::new(options.pixel_scale, options.pixel_offset),
        normalize: None,
    };
    info!(
        mode = %options.mode,
        inputs = inputs.len(),
        format = ?format,
        channel = %channel,
        "Building mosaic"
    );

    if !options.is_georeferenced() {
        return build_plain(&inputs[0], base, options, progress);
    }

    // Georeferences and output projection are settled before any pixel is
    // read, so configuration errors surface first.
    let georefs = inputs
        .iter()
        .map(|input| {
            make_input_georef(
                input.source.name(),
                input.georef.clone(),
                input.source.width(),
                input.source.height(),
                options,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let resolution = total_resolution(
        options.mode,
        georefs
            .iter()
            .zip(inputs)
            .map(|(g, input)| {
                let source = &input.source;
                (g.as_ref(), source.width(), source.height())
            }),
        options.global_resolution,
    );
    let xres = resolution / options.aspect_ratio.max(1);
    let output_georef: Box<dyn GeoReference> = match output_georef {
        Some(georef) => georef,
        None => Box::new(global_output_georef(options.mode, xres, resolution)?),
    };
    let output = OutputProjection::new(output_georef, resolution, options.aspect_ratio)?;
    info!(
        total_resolution = output.total_resolution(),
        xres = output.xres(),
        yres = output.yres(),
        "Output projection"
    );

    let mut stages = stages_for(inputs, &base);
    let conditioned = condition_all(inputs, &stages)?;
    if options.normalize {
        install_normalize_range(&mut stages, &conditioned);
    }

    let placed = conditioned
        .into_par_iter()
        .zip(inputs.par_iter())
        .zip(georefs.par_iter())
        .zip(stages.par_iter())
        .map(|(((image, input), georef), stage)| {
            let transform = GeoTransform::new(georef.as_ref(), output.georef());
            stage
                .place(input.source.name(), image, georef.as_ref(), &transform)
                .map_err(MosaicError::from)
        })
        .collect::<Result<Vec<PlacedImage>, MosaicError>>()?;

    let mut composite = ImageComposite::new(format, channel, blend_mode(options));
    for (placed, input) in placed.iter().zip(inputs) {
        let count = insert_wrapped(
            &mut composite,
            placed,
            output.total_resolution(),
            output.xres(),
        )?;
        debug!(
            image = input.source.name(),
            insertions = count,
            "Inserted image"
        );
    }

    let bbox = resolve_canvas_bbox(
        composite.bbox(),
        options.mode,
        output.total_resolution(),
        output.xres(),
        output.yres(),
    )?;
    info!(bbox = %bbox, "Resolved canvas bbox");

    let prepared = composite.prepare(bbox, progress)?;
    let mode_config = ModeConfig::derive(options, bbox, output.xres(), output.yres())?;

    Ok(MosaicOutput {
        data_bbox: prepared.data_bbox(),
        composite: prepared,
        bbox,
        mode_config,
        total_resolution: output.total_resolution(),
        xres: output.xres(),
        yres: output.yres(),
        tile_size: options.tile_size,
        file_type: options.file_type.clone(),
    })
}

/// Single non-georeferenced image: condition, normalize, done.
fn build_plain(
    input: &InputImage,
    base: StageConfig,
    options: &MosaicOptions,
    progress: &dyn ProgressCallback,
) -> Result<MosaicOutput, MosaicError> {
    let mut stage = ReprojectionStage::new(stage_config(input, &base));
    let image = stage.condition(input.source.as_ref())?;
    if options.normalize {
        stage.set_normalize_range(ValueRange::scan([&image]));
    }
    let placed = stage.pass_through(image);

    let mut composite = ImageComposite::new(base.format, base.channel, blend_mode(options));
    composite.insert(placed.image.clone(), 0, 0)?;
    let prepared = composite.prepare(placed.bbox, progress)?;

    let (xres, yres) = (placed.bbox.width() as u32, placed.bbox.height() as u32);
    Ok(MosaicOutput {
        data_bbox: prepared.data_bbox(),
        composite: prepared,
        bbox: placed.bbox,
        mode_config: ModeConfig::derive(options, placed.bbox, xres, yres)?,
        total_resolution: xres.max(yres),
        xres,
        yres,
        tile_size: options.tile_size,
        file_type: options.file_type.clone(),
    })
}

/// Pixel layout every input is converted to: RGB if any input has color,
/// and the requested channel type or else the first input's.
fn working_layout(inputs: &[InputImage], options: &MosaicOptions) -> (PixelFormat, ChannelType) {
    let format = if inputs
        .iter()
        .any(|input| input.source.format() == PixelFormat::Rgb)
    {
        PixelFormat::Rgb
    } else {
        PixelFormat::Gray
    };
    let channel = options
        .channel_type
        .or_else(|| inputs.first().map(|input| input.source.channel_type()))
        .unwrap_or_default();
    (format, channel)
}

fn blend_mode(options: &MosaicOptions) -> BlendMode {
    if options.multiband {
        BlendMode::Multiband
    } else {
        BlendMode::Draft
    }
}

fn stage_config(input: &InputImage, base: &StageConfig) -> StageConfig {
    StageConfig {
        nodata: input.nodata.or(base.nodata),
        rescale: LinearRescale::new(input.pixel_scale, input.pixel_offset).or(base.rescale),
        ..base.clone()
    }
}

fn stages_for(inputs: &[InputImage], base: &StageConfig) -> Vec<ReprojectionStage> {
    inputs
        .iter()
        .map(|input| ReprojectionStage::new(stage_config(input, base)))
        .collect()
}

fn condition_all(
    inputs: &[InputImage],
    stages: &[ReprojectionStage],
) -> Result<Vec<MaskedImage>, MosaicError> {
    inputs
        .par_iter()
        .zip(stages.par_iter())
        .map(|(input, stage)| {
            stage
                .condition(input.source.as_ref())
                .map_err(MosaicError::from)
        })
        .collect()
}

fn install_normalize_range(stages: &mut [ReprojectionStage], conditioned: &[MaskedImage]) {
    let range = ValueRange::scan(conditioned);
    info!(lo = range.lo, hi = range.hi, "Normalization range");
    for stage in stages {
        stage.set_normalize_range(range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::NullProgress;
    use crate::config::{ConfigError, DatumOverride, Projection};
    use crate::mode::Mode;
    use crate::geometry::{BBox2, GeometryError, Vector2};
    use crate::georef::EquirectGeoReference;
    use crate::source::{MemorySource, RasterBuffer, SourceError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gray_source(name: &str, width: u32, height: u32) -> MemorySource {
        let samples = (0..width * height).map(|i| (1 + i % 200) as f32).collect();
        let raster = RasterBuffer::new(
            width,
            height,
            PixelFormat::Gray,
            ChannelType::Uint8,
            samples,
        )
        .unwrap();
        MemorySource::new(name, raster)
    }

    fn flat_source(name: &str, width: u32, height: u32, value: f32) -> MemorySource {
        let samples = vec![value; (width * height) as usize];
        let raster = RasterBuffer::new(
            width,
            height,
            PixelFormat::Gray,
            ChannelType::Uint8,
            samples,
        )
        .unwrap();
        MemorySource::new(name, raster)
    }

    /// Georeference placing a `width`x`height` image at output column
    /// `col`, row `row` of a KML canvas at resolution 64 (5.625 degrees per
    /// pixel, top edge at latitude 180).
    fn kml64_georef(col: i32, row: i32, width: u32, height: u32) -> EquirectGeoReference {
        let step = 5.625;
        let west = -180.0 + step * col as f64;
        let north = 180.0 - step * row as f64;
        EquirectGeoReference::from_bounds(
            width,
            height,
            north,
            north - step * height as f64,
            west + step * width as f64,
            west,
        )
    }

    fn input(source: MemorySource, georef: EquirectGeoReference) -> InputImage {
        InputImage::new(Box::new(source)).with_georef(georef)
    }

    fn options(mode: Mode, resolution: u32) -> MosaicOptions {
        let mut opts = MosaicOptions::new();
        opts.mode = mode;
        opts.global_resolution = Some(resolution);
        opts
    }

    /// Counts reads so tests can tell whether pixels were touched.
    struct CountingSource {
        inner: MemorySource,
        reads: Arc<AtomicUsize>,
    }

    impl ImageSource for CountingSource {
        fn name(&self) -> &str {
            self.inner.name()
        }
        fn width(&self) -> u32 {
            self.inner.width()
        }
        fn height(&self) -> u32 {
            self.inner.height()
        }
        fn format(&self) -> PixelFormat {
            self.inner.format()
        }
        fn channel_type(&self) -> ChannelType {
            self.inner.channel_type()
        }
        fn read(&self) -> Result<RasterBuffer, SourceError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read()
        }
    }

    /// Output georeference squashing everything onto one point.
    struct Collapsed;

    impl GeoReference for Collapsed {
        fn proj4_str(&self) -> &str {
            "+proj=merc"
        }
        fn pixel_to_lonlat(&self, pixel: Vector2) -> Vector2 {
            pixel
        }
        fn lonlat_to_pixel(&self, _lonlat: Vector2) -> Vector2 {
            Vector2::new(5.0, 5.0)
        }
    }

    #[test]
    fn test_identity_global_mosaic_reproduces_input() {
        // Aspect ratio 2 makes the output a 32x64 global grid, the same as
        // the input's.
        let src = gray_source("world.tif", 32, 64);
        let expected = MaskedImage::opaque(&src.read().unwrap());
        let inputs = vec![input(src, EquirectGeoReference::global(32, 64))];
        let mut opts = options(Mode::Tms, 64);
        opts.aspect_ratio = 2;

        let out = build_mosaic(&inputs, &opts, None, &NullProgress).unwrap();
        assert_eq!((out.xres, out.yres, out.total_resolution), (32, 64, 64));
        assert_eq!(out.bbox, BBox2i::new(0, 0, 32, 64));
        assert_eq!(out.data_bbox, BBox2i::new(0, 0, 32, 64));
        assert_eq!(out.mode_config, ModeConfig::Tms);
        assert_eq!(out.composite.image(), &expected);
    }

    #[test]
    fn test_kml_regional_mosaic_aligns_to_tile_grid() {
        // 0.3515625 degrees per pixel, the output's KML pixel size at 1024,
        // placed so the image lands on [10, 10]-[310, 210].
        let georef = EquirectGeoReference::from_bounds(
            300,
            200,
            176.484375,
            106.171875,
            -71.015625,
            -176.484375,
        );
        let src = gray_source("region.tif", 300, 200);
        let first = src.read().unwrap().samples[0];
        let inputs = vec![input(src, georef)];

        let out = build_mosaic(&inputs, &options(Mode::Kml, 1024), None, &NullProgress).unwrap();
        assert_eq!(out.bbox, BBox2i::new(0, 0, 512, 512));
        assert_eq!(out.data_bbox, BBox2i::new(10, 10, 300, 200));

        let img = out.composite.image();
        assert_eq!(img.pixel(10, 10), &[first, 255.0]);
        assert_eq!(img.alpha(9, 10), 0.0);
        assert_eq!(img.alpha(309, 209), 255.0);
        assert_eq!(img.alpha(310, 209), 0.0);

        match out.mode_config {
            ModeConfig::Kml { longlat_bbox, .. } => {
                assert_eq!(longlat_bbox, BBox2::new(-180.0, 0.0, 180.0, 180.0));
            }
            other => panic!("expected KML config, got {:?}", other),
        }
    }

    #[test]
    fn test_image_across_the_seam_wraps() {
        // 5.625 degrees per pixel at resolution 64; the image spans
        // longitude 168.75 to 191.25, i.e. output columns 62 to 66.
        let georef = EquirectGeoReference::from_bounds(4, 4, 135.0, 112.5, 191.25, 168.75);
        let src = gray_source("seam.tif", 4, 4);
        let raster = src.read().unwrap();
        let inputs = vec![input(src, georef)];

        let out = build_mosaic(&inputs, &options(Mode::Kml, 64), None, &NullProgress).unwrap();
        assert_eq!(out.bbox, BBox2i::new(0, 0, 64, 64));

        let img = out.composite.image();
        // Left edge shows the part past +180.
        assert_eq!(img.pixel(0, 8)[0], raster.samples[2]);
        assert_eq!(img.pixel(1, 8)[0], raster.samples[3]);
        // Right edge shows the part before it.
        assert_eq!(img.pixel(62, 8)[0], raster.samples[0]);
        assert_eq!(img.pixel(63, 8)[0], raster.samples[1]);
        assert_eq!(img.alpha(10, 8), 0.0);
    }

    #[test]
    fn test_plain_mode_passes_through_with_normalization() {
        let samples = vec![10.0, 20.0, 30.0, 40.0];
        let raster =
            RasterBuffer::new(4, 1, PixelFormat::Gray, ChannelType::Uint8, samples).unwrap();
        let source = MemorySource::new("plain.png", raster);
        let inputs = vec![InputImage::new(Box::new(source))];
        let mut opts = MosaicOptions::new();
        opts.normalize = true;

        let out = build_mosaic(&inputs, &opts, None, &NullProgress).unwrap();
        assert_eq!(out.bbox, BBox2i::new(0, 0, 4, 1));
        assert_eq!(out.mode_config, ModeConfig::None);
        assert_eq!(
            out.composite.image().data,
            vec![0.0, 255.0, 85.0, 255.0, 170.0, 255.0, 255.0, 255.0]
        );
    }

    #[test]
    fn test_plain_mode_applies_rescale_and_nodata() {
        let samples = vec![0.0, 100.0, 200.0];
        let raster =
            RasterBuffer::new(3, 1, PixelFormat::Gray, ChannelType::Uint8, samples).unwrap();
        let source = MemorySource::new("plain.png", raster);
        let inputs = vec![InputImage::new(Box::new(source)).with_nodata(0.0)];
        let mut opts = MosaicOptions::new();
        opts.pixel_scale = Some(0.5 / 255.0);

        let out = build_mosaic(&inputs, &opts, None, &NullProgress).unwrap();
        assert_eq!(
            out.composite.image().data,
            vec![0.0, 0.0, 50.0, 255.0, 100.0, 255.0]
        );
    }

    #[test]
    fn test_projection_none_skips_georeferencing() {
        // No georeference at all; a georeferenced run would reject this input.
        let samples = vec![5.0, 6.0];
        let raster =
            RasterBuffer::new(2, 1, PixelFormat::Gray, ChannelType::Uint8, samples).unwrap();
        let source = MemorySource::new("scan.png", raster);
        let inputs = vec![InputImage::new(Box::new(source))];
        let mut opts = options(Mode::Tms, 64);
        opts.projection = Projection::None;

        let out = build_mosaic(&inputs, &opts, None, &NullProgress).unwrap();
        assert_eq!(out.bbox, BBox2i::new(0, 0, 2, 1));
        assert_eq!((out.xres, out.yres), (2, 1));
        assert_eq!(out.composite.image().data, vec![5.0, 255.0, 6.0, 255.0]);
    }

    #[test]
    fn test_sphere_datum_without_radius_is_rejected() {
        let inputs = vec![input(
            gray_source("moon.tif", 8, 8),
            EquirectGeoReference::global(8, 8),
        )];
        let mut opts = options(Mode::Tms, 64);
        opts.datum.kind = DatumOverride::Sphere;

        let err = build_mosaic(&inputs, &opts, None, &NullProgress).unwrap_err();
        assert_eq!(
            err,
            MosaicError::Config(ConfigError::SphereDatumWithoutRadius)
        );
    }

    #[test]
    fn test_configuration_errors_precede_pixel_reads() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            inner: gray_source("a.tif", 8, 8),
            reads: reads.clone(),
        };
        let inputs =
            vec![InputImage::new(Box::new(source)).with_georef(EquirectGeoReference::global(8, 8))];

        let err = build_mosaic(&inputs, &options(Mode::Gmap, 64), None, &NullProgress).unwrap_err();
        assert!(matches!(
            err,
            MosaicError::Config(ConfigError::OutputProjectionUnavailable(Mode::Gmap))
        ));
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_georeference_is_reported() {
        let inputs = vec![InputImage::new(Box::new(gray_source("plain.png", 8, 8)))];
        let err = build_mosaic(&inputs, &options(Mode::Tms, 64), None, &NullProgress).unwrap_err();
        assert!(matches!(
            err,
            MosaicError::Config(ConfigError::MissingGeoreference(ref name)) if name == "plain.png"
        ));
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let inputs = vec![
            input(
                gray_source("a.tif", 8, 8),
                EquirectGeoReference::global(8, 8),
            ),
            input(
                gray_source("b.tif", 8, 8),
                EquirectGeoReference::global(8, 8),
            ),
        ];
        let err = build_mosaic(&inputs, &MosaicOptions::new(), None, &NullProgress).unwrap_err();
        assert!(matches!(
            err,
            MosaicError::Config(ConfigError::NonGeoreferencedComposition)
        ));
    }

    #[test]
    fn test_collapsed_placement_aborts_run() {
        let inputs = vec![input(
            gray_source("a.tif", 8, 8),
            EquirectGeoReference::from_bounds(8, 8, 10.0, 0.0, 10.0, 0.0),
        )];
        let output: Option<Box<dyn GeoReference>> = Some(Box::new(Collapsed));
        let err =
            build_mosaic(&inputs, &options(Mode::Tms, 64), output, &NullProgress).unwrap_err();
        match err {
            MosaicError::Geometry(GeometryError::EmptyPlacement { image, .. }) => {
                assert_eq!(image, "a.tif")
            }
            other => panic!("expected empty placement, got {:?}", other),
        }
    }

    #[test]
    fn test_data_off_canvas_aborts_run() {
        // Latitudes above 90 land on rows -4..0 of a TMS canvas.
        let inputs = vec![input(
            gray_source("north.tif", 4, 4),
            EquirectGeoReference::from_bounds(4, 4, 101.25, 90.0, 45.0, 0.0),
        )];
        let mut opts = options(Mode::Tms, 64);
        opts.aspect_ratio = 2;

        let err = build_mosaic(&inputs, &opts, None, &NullProgress).unwrap_err();
        assert!(matches!(
            err,
            MosaicError::Geometry(GeometryError::EmptyTotalBBox { .. })
        ));
    }

    #[test]
    fn test_normalization_range_spans_all_inputs() {
        let inputs = vec![
            input(
                flat_source("dark.tif", 2, 2, 10.0),
                kml64_georef(8, 4, 2, 2),
            ),
            input(
                flat_source("bright.tif", 2, 2, 110.0),
                kml64_georef(10, 4, 2, 2),
            ),
        ];
        let mut opts = options(Mode::Kml, 64);
        opts.normalize = true;

        let out = build_mosaic(&inputs, &opts, None, &NullProgress).unwrap();
        assert_eq!(out.bbox, BBox2i::new(8, 4, 4, 4));
        assert_eq!(out.data_bbox, BBox2i::new(0, 0, 4, 2));

        let img = out.composite.image();
        // Each input alone would have a degenerate range; together they
        // stretch over [10, 110].
        for (x, y) in [(0, 0), (1, 1)] {
            assert_eq!(img.pixel(x, y), &[0.0, 255.0]);
        }
        for (x, y) in [(2, 0), (3, 1)] {
            assert_eq!(img.pixel(x, y), &[255.0, 255.0]);
        }
        assert_eq!(img.alpha(0, 2), 0.0);
    }

    #[test]
    fn test_draft_overlap_follows_input_order() {
        let build = |first: f32, second: f32| {
            let inputs = vec![
                input(flat_source("a.tif", 4, 4, first), kml64_georef(8, 4, 4, 4)),
                input(
                    flat_source("b.tif", 4, 4, second),
                    kml64_georef(10, 4, 4, 4),
                ),
            ];
            build_mosaic(&inputs, &options(Mode::Kml, 64), None, &NullProgress).unwrap()
        };

        let out = build(40.0, 200.0);
        assert_eq!(out.bbox, BBox2i::new(8, 0, 8, 8));
        assert_eq!(out.data_bbox, BBox2i::new(0, 4, 6, 4));
        let img = out.composite.image();
        assert_eq!(img.pixel(1, 5), &[40.0, 255.0]);
        assert_eq!(img.pixel(2, 5), &[200.0, 255.0]);
        assert_eq!(img.pixel(5, 5), &[200.0, 255.0]);

        let swapped = build(200.0, 40.0);
        assert_eq!(swapped.composite.image().pixel(2, 5), &[40.0, 255.0]);
    }

    #[test]
    fn test_multiband_overlap_blends_by_edge_distance() {
        let build = |swap: bool| {
            let mut inputs = vec![
                input(flat_source("a.tif", 4, 4, 40.0), kml64_georef(8, 4, 4, 4)),
                input(flat_source("b.tif", 4, 4, 200.0), kml64_georef(10, 4, 4, 4)),
            ];
            if swap {
                inputs.reverse();
            }
            let mut opts = options(Mode::Kml, 64);
            opts.multiband = true;
            build_mosaic(&inputs, &opts, None, &NullProgress).unwrap()
        };

        let out = build(false);
        assert_eq!(out.bbox, BBox2i::new(8, 0, 8, 8));
        let img = out.composite.image();
        assert_eq!(img.pixel(1, 5), &[40.0, 255.0]);
        // Column 10: a is two pixels from its edge, b one. (40*2 + 200) / 3.
        assert_eq!(img.pixel(2, 5), &[93.0, 255.0]);
        // Column 11: the other way round. (40 + 200*2) / 3.
        assert_eq!(img.pixel(3, 5), &[147.0, 255.0]);
        assert_eq!(img.pixel(5, 5), &[200.0, 255.0]);

        assert_eq!(build(true).composite.image(), img);
    }

    #[test]
    fn test_multiband_option_selects_blending() {
        let mut opts = MosaicOptions::new();
        assert_eq!(blend_mode(&opts), BlendMode::Draft);
        opts.multiband = true;
        assert_eq!(blend_mode(&opts), BlendMode::Multiband);
    }

    #[test]
    fn test_rgb_input_promotes_working_layout() {
        let gray = gray_source("a.tif", 2, 2);
        let samples = vec![1.0, 2.0, 3.0];
        let rgb = RasterBuffer::new(1, 1, PixelFormat::Rgb, ChannelType::Uint16, samples).unwrap();
        let inputs = vec![
            InputImage::new(Box::new(gray)),
            InputImage::new(Box::new(MemorySource::new("b.tif", rgb))),
        ];

        assert_eq!(
            working_layout(&inputs, &MosaicOptions::new()),
            (PixelFormat::Rgb, ChannelType::Uint8)
        );

        let mut opts = MosaicOptions::new();
        opts.channel_type = Some(ChannelType::Float32);
        assert_eq!(
            working_layout(&inputs, &opts),
            (PixelFormat::Rgb, ChannelType::Float32)
        );
    }
}
