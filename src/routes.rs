use crate::{
    api::{
        class, dashboard, fee_payment, fee_structure, pickup_location, report, score_grade,
        student, subject, teacher, test,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Limiter state per route group. Build once and share across workers,
/// otherwise each worker counts on its own.
#[derive(Clone)]
pub struct RateLimits {
    login: LimiterConfig,
    register: LimiterConfig,
    refresh: LimiterConfig,
    protected: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: limiter("login", config.rate_login_per_min)?,
            register: limiter("register", config.rate_register_per_min)?,
            refresh: limiter("refresh", config.rate_refresh_per_min)?,
            protected: limiter("protected", config.rate_protected_per_min)?,
        })
    }
}

fn limiter(name: &str, requests_per_min: u32) -> Result<LimiterConfig> {
    let requests_per_min = requests_per_min.max(1);
    GovernorConfigBuilder::default()
        .milliseconds_per_request((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit for {name}: {requests_per_min}/min"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(Governor::new(&limits.register))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(Governor::new(&limits.refresh))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(Governor::new(&limits.login))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(Governor::new(&limits.protected))
            .service(handlers::protected)
            // /students
            .service(
                web::resource("/students")
                    .route(web::get().to(student::list_students))
                    .route(web::post().to(student::create_student)),
            )
            .service(
                web::resource("/students/{student_id}")
                    .route(web::get().to(student::get_student))
                    .route(web::put().to(student::update_student))
                    .route(web::delete().to(student::delete_student)),
            )
            .service(
                web::resource("/students/{student_id}/balance")
                    .route(web::get().to(student::student_balance)),
            )
            // /teachers
            .service(
                web::resource("/teachers")
                    .route(web::get().to(teacher::list_teachers))
                    .route(web::post().to(teacher::create_teacher)),
            )
            .service(
                web::resource("/teachers/{teacher_id}")
                    .route(web::get().to(teacher::get_teacher))
                    .route(web::put().to(teacher::update_teacher))
                    .route(web::delete().to(teacher::delete_teacher)),
            )
            // /classes
            .service(
                web::resource("/classes")
                    .route(web::get().to(class::list_classes))
                    .route(web::post().to(class::create_class)),
            )
            .service(
                web::resource("/classes/{class_id}")
                    .route(web::get().to(class::get_class))
                    .route(web::put().to(class::update_class))
                    .route(web::delete().to(class::delete_class)),
            )
            // /subjects
            .service(
                web::resource("/subjects")
                    .route(web::get().to(subject::list_subjects))
                    .route(web::post().to(subject::create_subject)),
            )
            .service(
                web::resource("/subjects/{subject_id}")
                    .route(web::get().to(subject::get_subject))
                    .route(web::put().to(subject::update_subject))
                    .route(web::delete().to(subject::delete_subject)),
            )
            // /tests
            .service(
                web::resource("/tests")
                    .route(web::get().to(test::list_tests))
                    .route(web::post().to(test::create_test)),
            )
            .service(
                web::resource("/tests/{test_id}")
                    .route(web::get().to(test::get_test))
                    .route(web::put().to(test::update_test))
                    .route(web::delete().to(test::delete_test)),
            )
            // /score-grades
            .service(
                web::resource("/score-grades")
                    .route(web::get().to(score_grade::list_score_grades))
                    .route(web::post().to(score_grade::create_score_grade)),
            )
            .service(
                web::resource("/score-grades/{score_grade_id}")
                    .route(web::get().to(score_grade::get_score_grade))
                    .route(web::put().to(score_grade::update_score_grade))
                    .route(web::delete().to(score_grade::delete_score_grade)),
            )
            // /report/{student_id}/{term}/{year}
            .service(
                web::resource("/report/{student_id}/{term}/{year}")
                    .route(web::get().to(report::student_report)),
            )
            // /fee-structures
            .service(
                web::resource("/fee-structures")
                    .route(web::get().to(fee_structure::list_fee_structures))
                    .route(web::post().to(fee_structure::create_fee_structure)),
            )
            .service(
                web::resource("/fee-structures/{fee_structure_id}")
                    .route(web::get().to(fee_structure::get_fee_structure))
                    .route(web::put().to(fee_structure::update_fee_structure))
                    .route(web::delete().to(fee_structure::delete_fee_structure)),
            )
            // /pickup-locations
            .service(
                web::resource("/pickup-locations")
                    .route(web::get().to(pickup_location::list_pickup_locations))
                    .route(web::post().to(pickup_location::create_pickup_location)),
            )
            .service(
                web::resource("/pickup-locations/{location_id}")
                    .route(web::get().to(pickup_location::get_pickup_location))
                    .route(web::put().to(pickup_location::update_pickup_location))
                    .route(web::delete().to(pickup_location::delete_pickup_location)),
            )
            // /fee-payments
            .service(
                web::resource("/fee-payments")
                    .route(web::get().to(fee_payment::list_fee_payments))
                    .route(web::post().to(fee_payment::create_fee_payment)),
            )
            .service(
                web::resource("/fee-payments/{payment_id}")
                    .route(web::get().to(fee_payment::get_fee_payment))
                    .route(web::put().to(fee_payment::update_fee_payment))
                    .route(web::delete().to(fee_payment::delete_fee_payment)),
            )
            // /dashboard
            .service(
                web::scope("/dashboard")
                    .route("/summary", web::get().to(dashboard::summary))
                    .route("/notifications", web::get().to(dashboard::notifications))
                    .route("/chart/enrollment", web::get().to(dashboard::enrollment_chart))
                    .route(
                        "/chart/subject-popularity",
                        web::get().to(dashboard::subject_popularity),
                    )
                    .route("/quick-links", web::get().to(dashboard::quick_links)),
            ),
    );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL)
//  └─ refresh_token (REFRESH_TOKEN_TTL)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new token pair, old refresh token revoked

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rate_is_raised_to_one_per_minute() {
        assert!(limiter("login", 0).is_ok());
        assert!(limiter("protected", 1000).is_ok());
        assert!(limiter("protected", 120_000).is_ok());
    }
}
