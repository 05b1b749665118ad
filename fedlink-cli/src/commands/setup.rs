//! Setup command implementation.

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use fedlink_core::{
    run_setup, AzCliProvider, FederationStatus, GhCliClient, MockProvider, MockSourceControl,
    SetupReport, SetupRequest,
};

/// Execute the setup command.
pub async fn execute(
    app_name: String,
    subscription_id: String,
    resource_group: String,
    repo: String,
    use_mock: bool,
) -> Result<()> {
    let request = SetupRequest {
        app_name,
        subscription_id,
        resource_group,
        repo,
    };

    println!(
        "{}",
        format!(
            "🔗 Connecting {} to subscription {}...",
            request.repo, request.subscription_id
        )
        .dimmed()
    );

    let report = if use_mock {
        eprintln!(
            "{}",
            "Using mock clients - nothing will be provisioned!".yellow()
        );
        let provider = MockProvider::new();
        let source_control = MockSourceControl::new();
        run_setup(&provider, &source_control, &request).await?
    } else {
        let provider = AzCliProvider::new();
        let source_control = GhCliClient::new();
        run_setup(&provider, &source_control, &request).await?
    };

    info!(app_id = %report.application_id, "setup finished");
    print_report(&request, &report);
    Ok(())
}

fn print_report(request: &SetupRequest, report: &SetupReport) {
    let reused = |created: bool| if created { "created" } else { "reused" };

    println!();
    println!("{}", "✅ Federation setup complete!".green().bold());
    println!();
    println!(
        "   {} {} ({})",
        "Application:".dimmed(),
        report.application_id,
        reused(report.application_created)
    );
    println!(
        "   {} {} ({})",
        "Service principal:".dimmed(),
        report.service_principal_object_id,
        reused(report.service_principal_created)
    );
    println!(
        "   {} {} ({})",
        "Contributor scope:".dimmed(),
        request.role_scope(),
        reused(report.role_assignment_created)
    );
    println!("   {} {}", "Tenant:".dimmed(), report.tenant_id);
    println!(
        "   {} {}",
        "Federated credentials:".dimmed(),
        report.federation
    );

    if report.federation == FederationStatus::Unconfirmed {
        println!();
        println!(
            "{}",
            "⚠ The provider has not yet listed the new credentials; they were \
             accepted but may take a little longer to propagate."
                .yellow()
        );
    }

    println!();
    println!("   Add these to your workflow's azure/login step:");
    println!("   {} {}", "client-id:".dimmed(), report.application_id);
    println!("   {} {}", "tenant-id:".dimmed(), report.tenant_id);
    println!(
        "   {} {}",
        "subscription-id:".dimmed(),
        request.subscription_id
    );
}
