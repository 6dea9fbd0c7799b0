use std::process::ExitCode;

use artifact_reader::{ArtifactReader, BuildInfo, IconData};

fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: artifact-reader <file.apk|file.aab|file.ipa>");
        return ExitCode::FAILURE;
    };

    match ArtifactReader::inspect_path(&path) {
        Ok(info) => {
            print_summary(&info);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_summary(info: &BuildInfo) {
    println!("{} {} ({} bytes, {} entries)", info.platform, info.file_name, info.file_size, info.entry_count);
    if let Some(e) = &info.manifest_error {
        println!("  manifest error: {}", e);
    }

    if let Some(android) = &info.android {
        println!("  package:      {}", android.package.as_deref().unwrap_or("-"));
        println!(
            "  version:      {} ({})",
            android.version_name.as_deref().unwrap_or("-"),
            android.version_code.as_deref().unwrap_or("-")
        );
        println!(
            "  sdk:          min {} / target {}",
            android.min_sdk.as_deref().unwrap_or("-"),
            android.target_sdk.as_deref().unwrap_or("-")
        );
        println!("  debuggable:   {}", android.debuggable);
        println!("  signed:       {}", android.signing.signed);
        println!("  dex files:    {}", android.dex_count);
        println!("  architectures: {}", android.architectures.join(", "));
        if !android.modules.is_empty() {
            println!("  modules:      {}", android.modules.join(", "));
        }
        println!("  permissions:  {}", android.permissions.len());
        for activity in &android.activities {
            let marker = if activity.is_launcher { " (launcher)" } else { "" };
            println!("  activity:     {}{}", activity.name, marker);
        }
    }

    if let Some(ios) = &info.ios {
        println!("  bundle id:    {}", ios.bundle_id.as_deref().unwrap_or("-"));
        println!(
            "  name:         {}",
            ios.display_name
                .as_deref()
                .or(ios.app_name.as_deref())
                .unwrap_or("-")
        );
        println!(
            "  version:      {} ({})",
            ios.version.as_deref().unwrap_or("-"),
            ios.build_number.as_deref().unwrap_or("-")
        );
        println!("  min os:       {}", ios.min_os_version.as_deref().unwrap_or("-"));
        let families: Vec<String> = ios.device_families.iter().map(|f| f.to_string()).collect();
        println!("  devices:      {}", families.join(", "));
        println!("  frameworks:   {}", ios.frameworks.len());
        if let Some(prov) = &ios.provisioning {
            println!(
                "  provisioning: {} (team {})",
                prov.name.as_deref().unwrap_or("-"),
                prov.team_name.as_deref().unwrap_or("-")
            );
        }
    }

    match &info.icon {
        Some(IconData::Png(bytes)) => {
            println!("  icon:         {} ({} bytes)", info.icon_path.as_deref().unwrap_or("-"), bytes.len())
        }
        Some(IconData::Rgba { width, height, .. }) => {
            println!(
                "  icon:         {} (restored {}x{} RGBA)",
                info.icon_path.as_deref().unwrap_or("-"),
                width,
                height
            )
        }
        None => {}
    }
}
