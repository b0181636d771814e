use std::path::PathBuf;
use std::process::ExitCode;
use clap::Parser;
use dent_detect::dataset::validate_dataset;

/// Issues printed before the rest are summarized.
const SHOWN_ISSUES: usize = 20;

/// Checks a YOLO segmentation dataset before training
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory with the training images
    #[arg(long, value_name = "DIR")]
    images: PathBuf,

    /// Directory with one `<image stem>.txt` polygon label file per image
    #[arg(long, value_name = "DIR")]
    labels: PathBuf,

    /// Name shown in the report header
    #[arg(long, default_value = "Dataset")]
    name: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    println!("Validating {}", args.name);
    println!("   Images: {}", args.images.display());
    println!("   Labels: {}\n", args.labels.display());

    let report = match validate_dataset(&args.images, &args.labels) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("❌ {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    println!("Validation Results:");
    println!("   Total images: {}", report.total_images);
    println!("   Valid images: {}", report.valid_images);
    println!("   Total objects: {}", report.total_objects);
    println!("   Average objects per image: {:.2}\n", report.objects_per_image());

    if report.is_valid() {
        println!("✅ All images and labels are valid!");
        return ExitCode::SUCCESS;
    }

    println!("❌ Found {} issues:\n", report.issues.len());
    for issue in report.issues.iter().take(SHOWN_ISSUES) {
        println!("   • {}", issue);
    }
    if report.issues.len() > SHOWN_ISSUES {
        println!("\n   ... and {} more issues", report.issues.len() - SHOWN_ISSUES);
    }
    println!("\n⚠️  Please fix these issues before training");

    ExitCode::FAILURE
}
