use geotrip_core::geo_utils::Coordinate;
use geotrip_core::geofence::{GeofenceTracker, GeofenceZone};
use geotrip_core::location::LocationSample;
use geotrip_core::logs;
use std::fs::File;
use tempdir::TempDir;

#[test]
fn init_and_export() {
    let temp_dir = TempDir::new("trip-logs").unwrap();
    let cache_dir = temp_dir.path().to_str().unwrap();
    logs::init(cache_dir).unwrap();

    // produce a few lines
    let pickup = Coordinate::new(40.7128, -74.0060);
    let mut tracker = GeofenceTracker::new(
        GeofenceZone::new("pickup", pickup, 500.0).unwrap(),
        GeofenceZone::new("destination", Coordinate::new(40.7829, -73.9654), 500.0).unwrap(),
    )
    .unwrap();
    tracker.process_sample(&LocationSample::at(pickup));
    tracker.process_sample(&LocationSample::new(40.73, -74.0060, 4.0));
    log::logger().flush();

    // unrelated files in the log folder stay out of the archive
    std::fs::write(temp_dir.path().join("logs/crash.dmp"), b"not a log").unwrap();

    let target = temp_dir.path().join("logs.zip");
    let exported = logs::export(cache_dir, target.to_str().unwrap()).unwrap();
    assert!(exported >= 1);

    let archive = zip::ZipArchive::new(File::open(&target).unwrap()).unwrap();
    assert_eq!(archive.len(), exported);
    assert!(archive.file_names().any(|name| name == "logs/trip.log"));
    assert!(archive
        .file_names()
        .all(|name| name.starts_with("logs/trip.log")));
}
