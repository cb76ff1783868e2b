use console::Style;
use oes_core::frame::{FrameGroup, ProcessingStage};
use oes_core::pipeline::config::PipelineConfig;
use oes_core::pipeline::{ClassificationFailure, NightFrames, NightReport};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    error: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            error: Style::new().red().bold(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!(
        "  {}",
        s.title.apply_to("\u{2550}".repeat(title.chars().count()))
    );
    println!();
}

pub fn print_run_summary(config: &PipelineConfig) {
    let s = Styles::new();
    print_title(&s, "OES Night Calibration");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Extension"),
        s.value.apply_to(&config.extension)
    );
    let branches = if config.parallel_branches {
        "parallel"
    } else {
        "sequential"
    };
    println!(
        "  {:<14}{}",
        s.label.apply_to("Branches"),
        s.method.apply_to(branches)
    );
    println!();

    println!("  {}", s.header.apply_to("Reduction Engine"));
    match config.engine.timeout_secs {
        Some(secs) => println!(
            "    {:<12}{}",
            s.label.apply_to("Timeout"),
            s.value.apply_to(format!("{secs}s"))
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Timeout"),
            s.disabled.apply_to("none")
        ),
    }
    match config.engine.scratch_dir {
        Some(ref dir) => println!(
            "    {:<12}{}",
            s.label.apply_to("Scratch"),
            s.path.apply_to(dir.display())
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("Scratch"),
            s.disabled.apply_to("system temp")
        ),
    }
    println!();

    let cr = &config.cosmic_rays;
    println!("  {}", s.header.apply_to("Cosmic Rays"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Threshold"),
        s.value.apply_to(cr.threshold)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Flux ratio"),
        s.value.apply_to(cr.flux_ratio)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!("{0}x{0}", cr.window))
    );
    println!();
}

fn print_group(s: &Styles, group: &FrameGroup) {
    println!(
        "    {:<24}{}",
        s.label.apply_to(group.label()),
        s.value.apply_to(format!("{} frame(s)", group.len()))
    );
    for frame in group.frames() {
        println!("      {}", s.path.apply_to(frame.path().display()));
    }
}

pub fn print_classification(night: &NightFrames, rejected: &[ClassificationFailure]) {
    let s = Styles::new();
    print_title(&s, &format!("Night {}", night.night_id));

    println!("  {}", s.header.apply_to("Groups"));
    if night.zero.is_empty() {
        println!(
            "    {:<24}{}",
            s.label.apply_to("zero"),
            s.error.apply_to("missing")
        );
    } else {
        print_group(&s, &night.zero);
    }
    for group in night.calibration_groups() {
        print_group(&s, group);
    }
    println!();

    if !night.skipped.is_empty() {
        println!("  {}", s.header.apply_to("Skipped"));
        for frame in &night.skipped {
            println!(
                "    {:<24}{}",
                s.disabled.apply_to(frame.image_type()),
                s.path.apply_to(frame.path().display())
            );
        }
        println!();
    }

    print_rejected(&s, rejected);
}

fn print_rejected(s: &Styles, rejected: &[ClassificationFailure]) {
    if rejected.is_empty() {
        return;
    }
    println!("  {}", s.header.apply_to("Rejected"));
    for failure in rejected {
        println!(
            "    {}  {}",
            s.path.apply_to(failure.path.display()),
            s.error.apply_to(&failure.error)
        );
    }
    println!();
}

pub fn print_night_report(report: &NightReport) {
    let s = Styles::new();
    print_title(&s, &format!("Night {} Complete", report.night_id));

    println!(
        "  {:<14}{} {}",
        s.label.apply_to("Master zero"),
        s.path.apply_to(report.master.path().display()),
        s.label
            .apply_to(format!("({} frames)", report.master.source_count()))
    );
    println!();

    for branch in &report.branches {
        println!("  {}", s.header.apply_to(branch.stage));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Groups"),
            s.value.apply_to(branch.groups)
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Subtracted"),
            s.value.apply_to(branch.count(ProcessingStage::BiasSubtracted))
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Cleaned"),
            s.value.apply_to(branch.count(ProcessingStage::CosmicRayCleaned))
        );
        for failure in &branch.failures {
            println!(
                "    {:<12}{}: {}",
                s.error.apply_to("Failed"),
                failure.group,
                failure.error
            );
        }
        println!();
    }

    if !report.skipped.is_empty() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Skipped"),
            s.disabled
                .apply_to(format!("{} dark/domeflat frame(s)", report.skipped.len()))
        );
    }
    print_rejected(&s, &report.rejected);
}
