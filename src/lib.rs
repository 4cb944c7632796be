use std::{
    fs,
    io::{self, Read},
    path::Path,
};

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use log::info;
use serde::Deserialize;
use url::Url;

/// Endpoint the marker query is appended to.
const BASE_URL: &str = "https://maps.yandex.ru/";

/// Provider pin style; the point id becomes the visible pin label.
const PIN_STYLE: &str = "pmwtm";

/// Plot points from a JSON list as labelled pins on a Yandex map.
///
/// The input is a JSON array of point objects, e.g.
///
/// `[{"id": 1, "latitude": 55.75, "longitude": 37.62, "title": "Moscow"}]`
///
/// `id`, `latitude` and `longitude` are required, `title` is optional. The
/// positional argument may be either the JSON text itself or the path to a
/// file containing it; the map is centered on the first point.
#[derive(Debug, Parser)]
#[command(version, about, group(
    ArgGroup::new("source").required(true).args(["json_input", "stdin"])
))]
struct Cli {
    /// JSON text, or a path to a file containing it
    #[arg(value_name = "JSON")]
    json_input: Option<String>,

    /// Read the JSON text from standard input instead
    #[arg(long)]
    stdin: bool,

    /// Initial zoom level of the map view
    #[arg(short, long, value_name = "LEVEL", default_value_t = 5)]
    zoom: u8,

    /// Locale the map is rendered in
    #[arg(short, long, value_name = "TAG", default_value = "ru_RU")]
    lang: String,

    /// Print the URL to stdout instead of opening a browser
    #[arg(long)]
    no_browser: bool,
}

/// Run the command-line interface
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let points = if cli.stdin {
        info!("reading JSON from standard input");
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read standard input")?;
        points_from_json(&text)?
    } else {
        let input = cli
            .json_input
            .as_deref()
            .expect("clap guarantees an input source");
        load_points(input)?
    };

    if cli.no_browser {
        println!("{}", map_url(&points, cli.zoom, &cli.lang)?);
    } else {
        open_map(&points, cli.zoom, &cli.lang)?;
    }

    Ok(())
}

/// A single map marker. Coordinates are taken as-is; values outside the
/// usual ±90/±180 ranges are not rejected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Point {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Display name. The URL format has no label slot for it, so it is
    /// carried on the record but unused.
    pub title: Option<String>,
}

/// How the positional argument should be interpreted before parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum InputSource<'a> {
    /// The argument names an existing file whose contents are the JSON text.
    File(&'a Path),
    /// The argument is itself the JSON text.
    Text(&'a str),
}

/// Decide whether `input` is the path of an existing file or inline JSON.
pub fn resolve_input(input: &str) -> InputSource<'_> {
    let path = Path::new(input);
    if path.is_file() {
        InputSource::File(path)
    } else {
        InputSource::Text(input)
    }
}

/// Load points from a CLI argument that is either a filesystem path or
/// JSON text, resolved with [`resolve_input`].
pub fn load_points(input: &str) -> Result<Vec<Point>> {
    match resolve_input(input) {
        InputSource::File(path) => {
            info!("{} names an existing file, reading it", path.display());
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            points_from_json(&text)
                .with_context(|| format!("bad point list in {}", path.display()))
        }
        InputSource::Text(text) => {
            info!("argument is not a file path, treating it as JSON text");
            points_from_json(text)
        }
    }
}

/// Parse JSON text into the point list used for the map.
///
/// The top-level value must be an array and every element must carry the
/// `id`, `latitude` and `longitude` fields; one bad element fails the
/// whole batch.
pub fn points_from_json(text: &str) -> Result<Vec<Point>> {
    let doc: serde_json::Value =
        serde_json::from_str(text).context("input is not valid JSON")?;
    if !doc.is_array() {
        bail!("the top-level JSON value must be an array of points");
    }
    let points: Vec<Point> =
        serde_json::from_value(doc).context("malformed point object")?;
    info!("loaded {} points", points.len());
    Ok(points)
}

/// Format the point list as a map URL.
///
/// The map is centered on the first point and every point contributes one
/// `lon,lat,pmwtm<id>` marker token to the `pt` parameter.
pub fn map_url(points: &[Point], zoom: u8, lang: &str) -> Result<Url> {
    let Some(center) = points.first() else {
        bail!("no points to plot");
    };

    let markers = points
        .iter()
        .map(|p| format!("{},{},{PIN_STYLE}{}", p.longitude, p.latitude, p.id))
        .collect::<Vec<_>>()
        .join("~");

    let url = Url::parse_with_params(
        BASE_URL,
        [
            ("ll", format!("{},{}", center.longitude, center.latitude)),
            ("z", zoom.to_string()),
            ("lang", lang.to_string()),
            ("pt", markers),
        ],
    )
    .context("failed to build the map URL")?;
    info!("map URL: {url}");
    Ok(url)
}

/// Generate the map URL and hand it to the platform's browser opener.
pub fn open_map(points: &[Point], zoom: u8, lang: &str) -> Result<()> {
    let url = map_url(points, zoom, lang)?;
    open::that(url.as_str())
        .with_context(|| format!("failed to open {url} in a browser"))?;
    info!("map opened in the default browser");
    Ok(())
}
