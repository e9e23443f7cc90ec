#[cfg(windows)]
fn main() {
    use std::time::Duration;
    use virtual_desktops_win::DesktopService;

    env_logger::init();

    let service = DesktopService::connect(
        || println!("Desktop tracking initialized."),
        || println!("Virtual desktop registry changed, re-resolve the current desktop."),
    );

    match service.resolver().current_desktop_id() {
        Some(id) => println!("Current desktop: {}", id),
        None => println!("Current desktop could not be resolved."),
    }

    match service.resolver().known_desktop_ids() {
        Some(ids) => {
            println!("Known desktops ({}):", ids.len());
            for id in ids {
                println!("  {}", id);
            }
        }
        None => println!("No known-desktops record in the registry."),
    }

    println!("\nWatching for desktop changes for 30 seconds...");
    println!("Switch virtual desktops (Win+Ctrl+Left/Right) to see updates.");

    service.init();
    std::thread::sleep(Duration::from_secs(30));

    service.uninit();
    service.watcher().join();
    println!("Done.");
}

#[cfg(not(windows))]
fn main() {
    println!("This demo only runs on Windows.");
}
