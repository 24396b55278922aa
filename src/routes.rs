//! Commute route suggestions, driving-route planning, and geocoding.
//!
//! The route catalog is static local knowledge (jeepney/bus/tricycle/van
//! options to campus with fare estimates).  Turn-by-turn planning and place
//! lookup are consumed from public services, OSRM for driving routes and
//! Nominatim for search/reverse geocoding.  We never re-implement routing;
//! only `{distance, duration, steps[].instruction, steps[].distance}` are
//! consumed from the response.

use serde::{Deserialize, Serialize};

use crate::geo::Point;

pub const OSRM_BASE_URL: &str = "https://router.project-osrm.org";
pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Geocoding is restricted to the Philippines.
pub const GEOCODE_COUNTRY_CODES: &str = "ph";

/// Philippines bounding box as `west,north,east,south` for the geocoder
/// viewbox parameter.
pub const PH_VIEWBOX: &str = "116,21.5,127,4.5";

const USER_AGENT: &str = concat!("hilltop/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RoutingError {
    /// The service answered but found no route between the points.
    NoRoute,
    /// Transport-level failure reaching the service.
    Remote(String),
    /// The service answered with a payload we could not interpret.
    Malformed(String),
}

impl std::fmt::Display for RoutingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutingError::NoRoute => write!(f, "no route found"),
            RoutingError::Remote(msg) => write!(f, "routing service unreachable: {msg}"),
            RoutingError::Malformed(msg) => write!(f, "unexpected routing response: {msg}"),
        }
    }
}

impl std::error::Error for RoutingError {}

// ---------------------------------------------------------------------------
// Commute route catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleKind {
    Jeepney,
    Bus,
    Tricycle,
    Van,
    Car,
}

/// A suggested commute option to campus with a fare estimate in PHP.
#[derive(Debug, Clone, Serialize)]
pub struct CommuteRoute {
    pub id: &'static str,
    pub name: &'static str,
    pub vehicle: VehicleKind,
    pub fare_php: u32,
    pub duration_mins: u32,
    pub distance: &'static str,
    pub description: &'static str,
    pub stops: &'static str,
    pub steps: &'static [&'static str],
}

/// Known commute options from the Quezon City area to the campus.
pub fn route_catalog() -> &'static [CommuteRoute] {
    &[
        CommuteRoute {
            id: "1",
            name: "Jeepney via Commonwealth",
            vehicle: VehicleKind::Jeepney,
            fare_php: 15,
            duration_mins: 30,
            distance: "5.2 km",
            description: "Most common route. Take the Fairview-bound jeepney along \
                          Commonwealth Avenue. Affordable and frequent trips.",
            stops: "Commonwealth → Litex → Hilltop",
            steps: &[
                "Walk to the nearest jeepney stop on Commonwealth Ave.",
                "Look for jeepneys with 'Fairview' or 'Hilltop' sign",
                "Ride the jeepney going to Fairview direction",
                "Tell the driver to drop you at the Hilltop campus",
                "Fare: ₱15 (may vary slightly)",
            ],
        },
        CommuteRoute {
            id: "2",
            name: "Bus via EDSA + Jeep",
            vehicle: VehicleKind::Bus,
            fare_php: 25,
            duration_mins: 45,
            distance: "8.1 km",
            description: "Take a bus along EDSA to SM Fairview then transfer to a \
                          jeepney. Air-conditioned option.",
            stops: "EDSA → SM Fairview → Hilltop",
            steps: &[
                "Go to the nearest EDSA bus stop",
                "Ride a bus going to SM Fairview/Fairview Terminal",
                "Alight at SM Fairview Bus Terminal",
                "Transfer to jeepney going to Hilltop",
                "Bus Fare: ₱15-20 | Jeep Fare: ₱10",
            ],
        },
        CommuteRoute {
            id: "3",
            name: "Tricycle Direct",
            vehicle: VehicleKind::Tricycle,
            fare_php: 50,
            duration_mins: 10,
            distance: "2.1 km",
            description: "Direct and fastest option if you're nearby. Negotiate fare \
                          with the driver. Best for short distances.",
            stops: "Direct to campus gate",
            steps: &[
                "Hail a tricycle from your location",
                "Ask for the Hilltop campus",
                "Negotiate the fare (usually ₱50-80)",
                "Direct ride to the main gate",
                "Tip: Agree on fare before riding",
            ],
        },
        CommuteRoute {
            id: "4",
            name: "UV Express via Mindanao Ave",
            vehicle: VehicleKind::Van,
            fare_php: 20,
            duration_mins: 25,
            distance: "6.5 km",
            description: "UV Express/FX vans along Mindanao Avenue. Faster than \
                          jeepney, air-conditioned.",
            stops: "Trinoma → Mindanao Ave → Hilltop",
            steps: &[
                "Go to Trinoma or the nearest UV terminal",
                "Look for UV Express going to Fairview",
                "Ride the van along the Mindanao Avenue route",
                "Alight at the Hilltop area",
                "Walk 3-5 minutes to the campus gate",
            ],
        },
        CommuteRoute {
            id: "5",
            name: "Grab/Taxi",
            vehicle: VehicleKind::Car,
            fare_php: 150,
            duration_mins: 15,
            distance: "Varies",
            description: "Most convenient door-to-door option. Price varies based on \
                          traffic and distance.",
            stops: "Door to Door Service",
            steps: &[
                "Open the ride-hailing app",
                "Set pickup: your current location",
                "Set destination: Hilltop campus",
                "Choose a car or shared ride",
                "Confirm booking and wait for the driver",
            ],
        },
    ]
}

// ---------------------------------------------------------------------------
// Driving route planning (OSRM)
// ---------------------------------------------------------------------------

/// One navigation step, as consumed from the routing service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub instruction: String,
    pub distance_meters: f64,
}

/// A planned driving route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub steps: Vec<RouteStep>,
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Deserialize)]
struct OsrmStep {
    distance: f64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    maneuver: OsrmManeuver,
}

#[derive(Deserialize, Default)]
struct OsrmManeuver {
    instruction: Option<String>,
}

/// Interpret an OSRM route response.  Split from the transport so it can be
/// tested against canned payloads.
fn parse_osrm_response(body: OsrmResponse) -> Result<RoutePlan, RoutingError> {
    if body.code != "Ok" {
        return Err(RoutingError::NoRoute);
    }
    let Some(route) = body.routes.into_iter().next() else {
        return Err(RoutingError::NoRoute);
    };

    let steps = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| RouteStep {
            // The service may omit the maneuver instruction; fall back to
            // the road name.
            instruction: step
                .maneuver
                .instruction
                .filter(|s| !s.is_empty())
                .unwrap_or(step.name),
            distance_meters: step.distance,
        })
        .collect();

    Ok(RoutePlan {
        distance_meters: route.distance,
        duration_seconds: route.duration,
        steps,
    })
}

/// Plan a driving route between two points.  Coordinates go on the path as
/// `lng,lat;lng,lat` per the service's convention.
pub fn plan_route(base_url: &str, origin: Point, dest: Point) -> Result<RoutePlan, RoutingError> {
    let url = format!(
        "{}/route/v1/driving/{:.6},{:.6};{:.6},{:.6}",
        base_url.trim_end_matches('/'),
        origin.longitude,
        origin.latitude,
        dest.longitude,
        dest.latitude,
    );
    let body: OsrmResponse = ureq::get(&url)
        .query("overview", "full")
        .query("geometries", "geojson")
        .query("steps", "true")
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|e| RoutingError::Remote(e.to_string()))?
        .into_json()
        .map_err(|e| RoutingError::Malformed(e.to_string()))?;
    parse_osrm_response(body)
}

// ---------------------------------------------------------------------------
// Geocoding (Nominatim)
// ---------------------------------------------------------------------------

/// A geocoded place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
struct NominatimPlace {
    display_name: String,
    lat: String,
    lon: String,
}

fn place_from(raw: NominatimPlace) -> Result<Place, RoutingError> {
    let latitude = raw
        .lat
        .parse()
        .map_err(|_| RoutingError::Malformed(format!("bad latitude: {}", raw.lat)))?;
    let longitude = raw
        .lon
        .parse()
        .map_err(|_| RoutingError::Malformed(format!("bad longitude: {}", raw.lon)))?;
    Ok(Place {
        display_name: raw.display_name,
        latitude,
        longitude,
    })
}

/// Free-text place search, restricted to the configured country and
/// bounding box.  An empty result set is "no match", not an error.
pub fn search_places(base_url: &str, query: &str) -> Result<Vec<Place>, RoutingError> {
    let url = format!("{}/search", base_url.trim_end_matches('/'));
    let raw: Vec<NominatimPlace> = ureq::get(&url)
        .query("q", query)
        .query("format", "json")
        .query("countrycodes", GEOCODE_COUNTRY_CODES)
        .query("viewbox", PH_VIEWBOX)
        .query("bounded", "1")
        .query("limit", "10")
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|e| RoutingError::Remote(e.to_string()))?
        .into_json()
        .map_err(|e| RoutingError::Malformed(e.to_string()))?;
    raw.into_iter().map(place_from).collect()
}

/// Resolve a coordinate to the nearest address.  `Ok(None)` when the
/// geocoder has nothing for the point.
pub fn reverse_geocode(base_url: &str, point: Point) -> Result<Option<Place>, RoutingError> {
    let url = format!("{}/reverse", base_url.trim_end_matches('/'));
    let raw: serde_json::Value = ureq::get(&url)
        .query("lat", &point.latitude.to_string())
        .query("lon", &point.longitude.to_string())
        .query("format", "json")
        .set("User-Agent", USER_AGENT)
        .call()
        .map_err(|e| RoutingError::Remote(e.to_string()))?
        .into_json()
        .map_err(|e| RoutingError::Malformed(e.to_string()))?;

    // The service signals "nothing here" with an error field in a 200 body.
    if raw.get("error").is_some() || raw.get("display_name").is_none() {
        return Ok(None);
    }
    let parsed: NominatimPlace = serde_json::from_value(raw)
        .map_err(|e| RoutingError::Malformed(e.to_string()))?;
    place_from(parsed).map(Some)
}
