pub const MARKERS: &str = "markers";
