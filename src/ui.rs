// Terminal UI utilities

use colored::Colorize;

use crate::services::SyncReport;

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// Summary printed after a run
pub fn print_report(report: &SyncReport) {
    print_header("Firewall Sync Summary");

    print_info(&format!("Public IP: {}", report.public_ip));
    match report.previous_cidr.as_deref() {
        Some(previous) if report.policy_changed() => {
            print_info(&format!("Policy CIDR: {} → {}", previous, report.new_cidr))
        }
        Some(_) => print_info(&format!("Policy CIDR: {} (unchanged)", report.new_cidr)),
        None => print_info(&format!("Policy CIDR: (unset) → {}", report.new_cidr)),
    }

    if report.dry_run {
        print_warning("Dry run: policy not pushed, security rules not updated");
        return;
    }

    if let Some(url) = &report.commit_url {
        print_success(&format!("Policy pushed: {}", url));
    }
    for label in &report.updated_rules {
        print_success(&format!("{} security rule → {}", label, report.new_cidr));
    }
}
