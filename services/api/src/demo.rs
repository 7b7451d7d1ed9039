use crate::infra::{
    EnvPaymentGateway, InMemoryApplicationRepository, InMemoryEarningsLedger, InMemoryNotifier,
    InMemoryPaymentRepository, InMemoryProjectRepository, LocalFileStore,
};
use campuslance::error::AppError;
use campuslance::workflows::identity::ActorContext;
use campuslance::workflows::outbound::AdminAudience;
use campuslance::workflows::payments::{PaymentCoordinator, ReleaseMethod};
use campuslance::workflows::projects::applications::{
    ApplicationDraft, EstimatedTime, SelectionCoordinator, StudentSnapshot,
};
use campuslance::workflows::projects::submissions::{
    AttachmentUpload, WorkSubmission, WorkSubmissionCoordinator,
};
use campuslance::workflows::projects::{
    ExpirySweeper, ProjectCatalog, ProjectCategory, ProjectDraft, ProjectDuration,
    ProjectRepository, StudentId, UserId,
};
use chrono::{Duration, Utc};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Platform fee percentage applied to escrow payments
    #[arg(long, default_value_t = 7)]
    pub(crate) fee_percent: u64,
    /// Revision requests allowed per project before reject becomes available
    #[arg(long, default_value_t = 2)]
    pub(crate) max_revisions: u32,
    /// Skip the expiry sweep portion of the demo
    #[arg(long)]
    pub(crate) skip_sweep: bool,
}

#[derive(Args, Debug)]
pub(crate) struct SweepArgs {
    /// Number of expired demo projects to seed before sweeping
    #[arg(long, default_value_t = 2)]
    pub(crate) expired_projects: usize,
    /// Applications seeded per expired project
    #[arg(long, default_value_t = 2)]
    pub(crate) applications_each: usize,
}

type Projects = InMemoryProjectRepository;
type Applications = InMemoryApplicationRepository;
type Payments = InMemoryPaymentRepository;
type Ledger = InMemoryEarningsLedger;
type Notif = InMemoryNotifier;

struct DemoStack {
    projects: Arc<Projects>,
    applications: Arc<Applications>,
    notifier: Arc<Notif>,
    catalog: ProjectCatalog<Projects>,
    selection: SelectionCoordinator<Projects, Applications, Notif>,
    workspace: WorkSubmissionCoordinator<
        Projects,
        Payments,
        EnvPaymentGateway,
        Ledger,
        Notif,
        LocalFileStore,
    >,
    payments: Arc<PaymentCoordinator<Projects, Payments, EnvPaymentGateway, Ledger, Notif>>,
}

const DEMO_GATEWAY_SECRET: &str = "demo-secret";

fn build_stack(fee_percent: u64, max_revisions: u32) -> DemoStack {
    let projects = Arc::new(Projects::default());
    let applications = Arc::new(Applications::default());
    let payment_records = Arc::new(Payments::default());
    let ledger = Arc::new(Ledger::default());
    let notifier = Arc::new(Notif::default());
    let gateway = Arc::new(EnvPaymentGateway::with_secret(DEMO_GATEWAY_SECRET));
    let files = Arc::new(LocalFileStore);
    let admins = AdminAudience::new(vec![UserId("admin-ops".to_string())]);

    let catalog = ProjectCatalog::new(projects.clone(), max_revisions);
    let selection =
        SelectionCoordinator::new(projects.clone(), applications.clone(), notifier.clone());
    let payments = Arc::new(PaymentCoordinator::new(
        projects.clone(),
        payment_records,
        gateway,
        ledger,
        notifier.clone(),
        admins.clone(),
        fee_percent,
    ));
    let workspace = WorkSubmissionCoordinator::new(
        projects.clone(),
        payments.clone(),
        files,
        notifier.clone(),
        admins,
    );

    DemoStack {
        projects,
        applications,
        notifier,
        catalog,
        selection,
        workspace,
        payments,
    }
}

fn demo_err(err: impl std::fmt::Display) -> AppError {
    AppError::from(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}

fn demo_draft(title: &str) -> ProjectDraft {
    ProjectDraft {
        title: title.to_string(),
        description: "Build and ship the feature described in the attached brief.".to_string(),
        category: ProjectCategory::BackendDevelopment,
        required_skills: vec!["rust".to_string(), "postgres".to_string()],
        budget_min: 500,
        budget_max: 1000,
        duration: ProjectDuration::OneMonth,
        deadline: Utc::now() + Duration::days(21),
    }
}

fn demo_application(price: u64) -> ApplicationDraft {
    ApplicationDraft {
        cover_letter:
            "I have delivered three comparable backend projects and can start immediately."
                .to_string(),
        proposed_price: price,
        estimated_time: EstimatedTime::ThreeToFourWeeks,
    }
}

fn demo_snapshot(name: &str) -> StudentSnapshot {
    StudentSnapshot {
        name: name.to_string(),
        college: "State Engineering College".to_string(),
        city: "Pune".to_string(),
        skills: vec!["rust".to_string(), "sql".to_string()],
        resume_url: Some(format!("https://cdn.campuslance.local/resumes/{name}.pdf")),
        captured_at: Utc::now(),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        fee_percent,
        max_revisions,
        skip_sweep,
    } = args;

    let stack = build_stack(fee_percent, max_revisions);
    let company = ActorContext::company("co-acme");
    let admin = ActorContext::admin("admin-ops");

    println!("Campuslance marketplace demo");
    println!("Fee: {fee_percent}% | revision cap: {max_revisions}");

    println!("\nProject publication");
    let project = stack
        .catalog
        .create(&company, demo_draft("Partner API integration"))
        .map_err(demo_err)?;
    println!(
        "- {} published \"{}\" (budget {}-{})",
        project.company.0, project.title, project.budget_min, project.budget_max
    );

    println!("\nApplication intake");
    let candidates = [("stu-asha", "Asha", 900), ("stu-bilal", "Bilal", 850), ("stu-chitra", "Chitra", 950)];
    let mut submitted = Vec::new();
    for (student, name, price) in candidates {
        let record = stack
            .selection
            .apply(
                StudentId(student.to_string()),
                &project.id,
                demo_application(price),
                demo_snapshot(name),
            )
            .map_err(demo_err)?;
        println!(
            "- {} applied as {} (proposed {})",
            name, record.id.0, record.proposed_price
        );
        submitted.push(record);
    }

    stack
        .selection
        .shortlist(&submitted[1].id, &company)
        .map_err(demo_err)?;
    println!("- {} shortlisted", submitted[1].snapshot.name);

    println!("\nSelection decision");
    let winner = stack
        .selection
        .approve(&submitted[0].id, &company)
        .map_err(demo_err)?;
    println!("- Accepted {} ({})", winner.snapshot.name, winner.id.0);
    for application in stack
        .selection
        .for_project(&project.id, &company)
        .map_err(demo_err)?
    {
        println!(
            "  - {}: {}{}",
            application.snapshot.name,
            application.status.label(),
            application
                .rejection_reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default()
        );
    }

    println!("\nEscrow order");
    let student_actor = ActorContext::student(winner.student.0.clone());
    let order = stack
        .payments
        .create_order(&project.id, &company, None)
        .map_err(demo_err)?;
    println!(
        "- Order {} for {} (fee {}, net {})",
        order
            .gateway_order
            .as_ref()
            .map(|o| o.order_ref.as_str())
            .unwrap_or("<gateway unavailable>"),
        order.payment.amount,
        order.payment.platform_fee,
        order.payment.net_amount
    );
    if let Some(gateway_order) = &order.gateway_order {
        let signature = EnvPaymentGateway::expected_signature(
            DEMO_GATEWAY_SECRET,
            &gateway_order.order_ref,
            "gw-pay-0001",
        );
        let captured = stack
            .payments
            .verify_and_capture(&gateway_order.order_ref, "gw-pay-0001", &signature, &company)
            .map_err(demo_err)?;
        println!("- Captured -> status {}", captured.status.label());
    }

    println!("\nDelivery workspace");
    stack
        .workspace
        .start_work(&project.id, &student_actor)
        .map_err(demo_err)?;
    println!("- {} started work", winner.snapshot.name);

    let first_delivery = WorkSubmission {
        attachments: vec![AttachmentUpload {
            name: "integration.zip".to_string(),
            content: b"demo-archive".to_vec(),
        }],
        links: vec!["https://git.campuslance.local/asha/integration".to_string()],
        message: "First complete pass, staging credentials included.".to_string(),
    };
    let (_, submission) = stack
        .workspace
        .submit_work(&project.id, &student_actor, first_delivery)
        .map_err(demo_err)?;
    println!("- Submitted version {}", submission.version);

    stack
        .workspace
        .request_revision(
            &project.id,
            &company,
            "Please add retry handling around the webhook consumer.".to_string(),
        )
        .map_err(demo_err)?;
    println!("- Revision requested");

    let second_delivery = WorkSubmission {
        links: vec!["https://git.campuslance.local/asha/integration".to_string()],
        message: "Webhook consumer now retries with backoff.".to_string(),
        ..WorkSubmission::default()
    };
    let (_, submission) = stack
        .workspace
        .submit_work(&project.id, &student_actor, second_delivery)
        .map_err(demo_err)?;
    println!("- Submitted version {}", submission.version);

    let (project_after, _) = stack
        .workspace
        .approve_work(&project.id, &company, Some("Great work, shipping it.".to_string()))
        .map_err(demo_err)?;
    println!(
        "- Work approved -> project {} / payment {}",
        project_after.status.label(),
        project_after
            .payment_status
            .map(|s| s.label())
            .unwrap_or("none")
    );

    println!("\nEscrow release");
    let pending = stack.payments.pending_releases(&admin).map_err(demo_err)?;
    println!("- {} payment(s) awaiting release", pending.len());
    for payment in &pending {
        let released = stack
            .payments
            .release(
                &payment.id,
                &admin,
                ReleaseMethod::ManualTransfer,
                "Demo settlement".to_string(),
            )
            .map_err(demo_err)?;
        println!(
            "- Released {}: {} gross / {} net to {}",
            released.id.0, released.amount, released.net_amount, released.student.0
        );
    }

    let earnings = stack
        .payments
        .student_earnings(&student_actor)
        .map_err(demo_err)?;
    println!(
        "- {} earnings: {} earned, {} pending, {} project(s) completed",
        winner.snapshot.name,
        earnings.earnings.total_earned,
        earnings.earnings.pending_payments,
        earnings.earnings.completed_projects
    );
    let spend = stack
        .payments
        .company_payments(&company)
        .map_err(demo_err)?;
    println!(
        "- {} spend: {} across {} payment(s)",
        project.company.0, spend.spend.total_spent, spend.spend.payments_made
    );
    let revenue = stack.payments.platform_revenue(&admin).map_err(demo_err)?;
    println!("- Platform revenue: {revenue}");

    if !skip_sweep {
        println!("\nExpiry sweep");
        seed_expired_projects(&stack, 1, 2)?;
        let report = ExpirySweeper::new(
            stack.projects.clone(),
            stack.applications.clone(),
            stack.notifier.clone(),
        )
        .sweep(Utc::now())
        .map_err(demo_err)?;
        println!(
            "- Closed {} project(s), rejected {} application(s), {} failure(s)",
            report.projects_closed,
            report.applications_rejected,
            report.failures.len()
        );
    }

    println!("\nNotification feed");
    let events = stack.notifier.events();
    println!("- {} notification(s) dispatched", events.len());
    for event in events {
        println!("  - [{}] {} -> {}", event.kind, event.user.0, event.message);
    }

    Ok(())
}

pub(crate) fn run_sweep(args: SweepArgs) -> Result<(), AppError> {
    let SweepArgs {
        expired_projects,
        applications_each,
    } = args;

    let stack = build_stack(7, 2);
    seed_expired_projects(&stack, expired_projects, applications_each)?;

    let report = ExpirySweeper::new(
        stack.projects.clone(),
        stack.applications.clone(),
        stack.notifier.clone(),
    )
    .sweep(Utc::now())
    .map_err(demo_err)?;

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(err) => println!("sweep report unavailable: {err}"),
    }
    Ok(())
}

/// Publish projects, attach applications, then backdate the deadlines so the
/// sweep has something to close.
fn seed_expired_projects(
    stack: &DemoStack,
    projects: usize,
    applications_each: usize,
) -> Result<(), AppError> {
    let company = ActorContext::company("co-acme");

    for index in 0..projects {
        let project = stack
            .catalog
            .create(&company, demo_draft(&format!("Stale listing {}", index + 1)))
            .map_err(demo_err)?;

        for applicant in 0..applications_each {
            let student = format!("stu-late-{index}-{applicant}");
            stack
                .selection
                .apply(
                    StudentId(student.clone()),
                    &project.id,
                    demo_application(700),
                    demo_snapshot(&student),
                )
                .map_err(demo_err)?;
        }

        let mut stale = stack
            .projects
            .fetch(&project.id)
            .map_err(demo_err)?
            .ok_or_else(|| demo_err("seeded project vanished"))?;
        stale.deadline = Utc::now() - Duration::days(1);
        stack.projects.update(stale).map_err(demo_err)?;
    }
    Ok(())
}
