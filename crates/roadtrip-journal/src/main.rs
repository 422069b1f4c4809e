// The binary uses the library, not duplicate modules
use chrono::Utc;
use roadtrip_journal::{JournalApp, JournalResult, Settings, ToastKind, map_routes, overview_region};
use roadtrip_lib::geodesy::total_route_distance;
use roadtrip_lib::{LatLng, Point, PointType, User, generate_id};
use std::process::ExitCode;

fn main() -> ExitCode {
    let settings = Settings::from_cli();

    journal_entrypoints::run_native("Road Trip Journal", |app_name| async move {
        let app = match JournalApp::new(&settings) {
            Ok(app) => app,
            Err(e) => {
                tracing::error!("{} failed to start: {}", app_name, e);
                return ExitCode::FAILURE;
            }
        };

        match run(&app, &settings).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                app.toast.show_error(&e);
                tracing::error!("{}", e);
                ExitCode::FAILURE
            }
        }
    })
}

async fn run(app: &JournalApp, settings: &Settings) -> JournalResult<()> {
    if settings.logout {
        app.session.logout().await;
    }

    app.session.check_auth().await;
    if !app.session.state().is_authenticated {
        let Some(email) = settings.email.as_deref() else {
            println!("No saved session. Log in with --email <address>.");
            return Ok(());
        };
        app.session.login(email).await?;
    }

    let Some(user) = app.session.user() else {
        return Ok(());
    };
    print_profile(&user);
    println!("Theme: {}", app.theme.mode());

    let mut trips = app.client.user_roadtrips(&user.id);
    let state = trips.settled().await;
    if let Some(e) = state.error {
        return Err(e);
    }
    let trips = state.data.unwrap_or_default();

    for trip in trips.iter() {
        println!(
            "\n{} ({} days, {} km measured, {} km recorded)",
            trip.title,
            trip.stats.duration,
            total_route_distance(&trip.polyline),
            trip.stats.distance
        );
        let mut points = app.client.points(&trip.id);
        for point in points.settled().await.data.iter().flat_map(|p| p.iter()) {
            println!("  {}. {} [{:?}]", point.display_number(), point.title, point.point_type);
        }
    }

    let Some(first) = trips.first() else {
        return Ok(());
    };
    app.map.select_roadtrip(Some(first.id.clone()));
    let routes = map_routes(&trips, app.map.state().selected_roadtrip_id.as_deref());
    if let Some(region) = overview_region(&routes) {
        println!(
            "\nMap overview: center {:.3},{:.3} span {:.1}x{:.1} degrees",
            region.center.latitude,
            region.center.longitude,
            region.latitude_delta,
            region.longitude_delta
        );
    }

    demo_invalidation(app, &first.id).await
}

fn print_profile(user: &User) {
    println!("Logged in as {} <{}>", user.name, user.email);
    if let Some(stats) = &user.stats {
        println!(
            "{} trips, {} km, {} countries",
            stats.roadtrips_count, stats.distance_traveled, stats.countries_visited
        );
    }
}

/// Add a stop to a trip and remove it again while a query observes the list
async fn demo_invalidation(app: &JournalApp, roadtrip_id: &str) -> JournalResult<()> {
    let mut points = app.client.points(roadtrip_id);
    let before = points.settled().await.data.map_or(0, |p| p.len());

    let point = Point {
        id: generate_id(),
        roadtrip_id: roadtrip_id.to_string(),
        title: "Unplanned detour".to_string(),
        description: "Added from the command line".to_string(),
        coordinates: LatLng::new(36.2704, -121.8081),
        point_type: PointType::Nature,
        date: Utc::now(),
        order: i32::try_from(before).unwrap_or(i32::MAX),
        articles: Vec::new(),
        galleries: Vec::new(),
        cover_image: None,
    };
    let created = app.client.create_point().mutate(point).await?;
    app.toast.show_toast("Point added", ToastKind::Success);

    let after = points.settled().await.data.map_or(0, |p| p.len());
    println!("\nPoints: {before} -> {after} after adding \"{}\"", created.title);

    app.client.delete_point().mutate(created.id).await?;
    let restored = points.settled().await.data.map_or(0, |p| p.len());
    println!("Points: {after} -> {restored} after removing it again");
    Ok(())
}
