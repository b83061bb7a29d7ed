use std::sync::Arc;

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse, ResponseError};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::analytics::CohortAnalyzer;
use crate::data::ReferenceDataset;
use crate::engine::PredictionEngine;
use crate::error::{DatasetError, EngineError, PredictionError, RegistryError, SchemaError};
use crate::model::{Assessment, Role, StudentProfile};
use crate::registry::ModelRegistry;
use crate::report::{self, REPORT_FILE_NAME};

#[derive(Deserialize, Debug)]
pub struct PredictRequest {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(flatten)]
    pub profile: StudentProfile,
}

#[derive(Serialize)]
struct StatusResponse<'a> {
    ready: bool,
    dataset_records: Option<usize>,
    models: &'a [String],
    problem: Option<&'a str>,
    version: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotReady(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotReady(_) | ApiError::Engine(EngineError::NotReady(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Schema(_) | ApiError::Engine(EngineError::Prediction(PredictionError::Schema(_))) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Engine(EngineError::UnknownModel(_)) => StatusCode::NOT_FOUND,
            ApiError::Engine(EngineError::Prediction(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

/// Shared, read-only service state. When loading failed the engine is
/// absent and every prediction route answers 503.
pub struct AppState {
    engine: Option<PredictionEngine>,
    dataset: Option<Arc<ReferenceDataset>>,
    models: Vec<String>,
    problem: Option<String>,
}

impl AppState {
    pub fn from_loaded(
        dataset: Result<ReferenceDataset, DatasetError>,
        registry: Result<ModelRegistry, RegistryError>,
    ) -> Self {
        let dataset = match dataset {
            Ok(ds) => {
                info!("Loaded {} reference records", ds.len());
                Arc::new(ds)
            }
            Err(e) => {
                error!("Reference dataset unavailable: {e}");
                return Self::degraded(None, Vec::new(), format!("models not loaded: dataset: {e}"));
            }
        };
        let registry = match registry {
            Ok(r) => Arc::new(r),
            Err(e) => {
                error!("Model loading failed: {e}");
                return Self::degraded(Some(dataset), Vec::new(), format!("models not loaded: {e}"));
            }
        };
        let models: Vec<String> = registry.classifier_names().iter().map(|n| n.to_string()).collect();

        match PredictionEngine::new(dataset.clone(), registry) {
            Ok(engine) => Self {
                engine: Some(engine),
                dataset: Some(dataset),
                models,
                problem: None,
            },
            Err(e) => {
                warn!("{e}");
                Self::degraded(Some(dataset), models, e.to_string())
            }
        }
    }

    fn degraded(dataset: Option<Arc<ReferenceDataset>>, models: Vec<String>, problem: String) -> Self {
        Self {
            engine: None,
            dataset,
            models,
            problem: Some(problem),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    fn engine(&self) -> Result<&PredictionEngine, ApiError> {
        self.engine.as_ref().ok_or_else(|| {
            ApiError::NotReady(self.problem.clone().unwrap_or_else(|| "models not loaded".into()))
        })
    }

    fn assess(&self, req: &PredictRequest) -> Result<Assessment, ApiError> {
        let engine = self.engine()?;
        req.profile.validate()?;
        Ok(engine.predict(&req.profile, req.model.as_deref(), Role::parse(&req.role))?)
    }
}

async fn predict(req: web::Json<PredictRequest>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let assessment = state.assess(&req)?;
    info!(
        "Prediction via {}: {} ({}%)",
        assessment.model, assessment.result.outcome, assessment.result.confidence
    );
    Ok(HttpResponse::Ok().json(assessment))
}

async fn download_report(req: web::Json<PredictRequest>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let assessment = state.assess(&req)?;
    let text = report::render(
        &assessment.result,
        &req.profile,
        &req.role,
        chrono::Local::now().naive_local(),
    );
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
        ))
        .body(text))
}

async fn status(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        ready: state.is_ready(),
        dataset_records: state.dataset.as_ref().map(|d| d.len()),
        models: &state.models,
        problem: state.problem.as_deref(),
        version: report::SYSTEM_VERSION,
    })
}

async fn analytics(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let dataset = state
        .dataset
        .as_ref()
        .ok_or_else(|| ApiError::NotReady("reference dataset unavailable".into()))?;
    Ok(HttpResponse::Ok().json(CohortAnalyzer::new(dataset).summarize()))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("EduPredict is running!")
}

async fn serve_homepage() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html")
        .body(HOMEPAGE)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(serve_homepage))
        .route("/health", web::get().to(health_check))
        .route("/status", web::get().to(status))
        .route("/analytics", web::get().to(analytics))
        .route("/predict", web::post().to(predict))
        .route("/report", web::post().to(download_report));
}

const HOMEPAGE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>EduPredict - Academic Intelligence Platform</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 820px; margin: 40px auto; padding: 20px; }
        .container { background: #f5f5f5; padding: 25px; border-radius: 10px; }
        .grid { display: grid; grid-template-columns: 1fr 1fr; gap: 12px 20px; }
        label { display: block; margin-bottom: 4px; font-weight: bold; }
        input, select { width: 100%; padding: 8px; border: 1px solid #ddd; border-radius: 4px; }
        button { background: #007bff; color: white; padding: 12px 24px; border: none; border-radius: 4px; cursor: pointer; margin: 5px; }
        .result { margin-top: 20px; padding: 20px; border-radius: 5px; display: none; }
        .Dropout { background: #f8d7da; color: #721c24; }
        .Enrolled { background: #fff3cd; color: #856404; }
        .Graduate { background: #d4edda; color: #155724; }
        .error { background: #f8d7da; color: #721c24; }
    </style>
</head>
<body>
    <div class="container">
        <h1>EduPredict</h1>
        <p id="status">Checking models...</p>
        <div class="grid">
            <div><label for="role">Viewer role</label>
                <select id="role"><option>student</option><option>teacher</option><option>counselor</option></select></div>
            <div><label for="model">Model</label><select id="model"></select></div>
            <div><label for="age">Age (17-60)</label><input type="number" id="age" step="1" value="22"></div>
            <div><label for="admission_grade">Admission score (0-200)</label><input type="number" id="admission_grade" step="0.1" value="120.0"></div>
            <div><label for="gender">Gender</label><select id="gender"><option>male</option><option>female</option></select></div>
            <div><label for="scholarship">Scholarship</label><select id="scholarship"><option>yes</option><option>no</option></select></div>
            <div><label for="tuition_paid">Tuition paid</label><select id="tuition_paid"><option>yes</option><option>no</option></select></div>
            <div><label for="sem1_grade">Sem 1 grade (0-20)</label><input type="number" id="sem1_grade" step="0.1" value="12.0"></div>
            <div><label for="sem2_grade">Sem 2 grade (0-20)</label><input type="number" id="sem2_grade" step="0.1" value="12.0"></div>
            <div><label for="unemployment">Unemployment (0-20)</label><input type="number" id="unemployment" step="0.1" value="7.5"></div>
            <div><label for="inflation">Inflation (0-10)</label><input type="number" id="inflation" step="0.1" value="3.0"></div>
            <div><label for="gdp">GDP index (0-200000)</label><input type="number" id="gdp" step="100" value="100000"></div>
        </div>
        <button onclick="analyze()">Initiate analysis</button>
        <button onclick="downloadReport()" style="background: #28a745;">Download report</button>
        <div id="result" class="result"></div>
    </div>

    <script>
        const numeric = ['age', 'admission_grade', 'sem1_grade', 'sem2_grade', 'unemployment', 'inflation', 'gdp'];
        const choices = ['role', 'gender', 'scholarship', 'tuition_paid'];

        function payload() {
            const body = {};
            numeric.forEach(id => body[id] = parseFloat(document.getElementById(id).value));
            choices.forEach(id => body[id] = document.getElementById(id).value);
            const model = document.getElementById('model').value;
            if (model) body.model = model;
            return body;
        }

        async function post(path) {
            const response = await fetch(path, {
                method: 'POST',
                headers: {'Content-Type': 'application/json'},
                body: JSON.stringify(payload())
            });
            if (!response.ok) {
                const data = await response.json();
                throw new Error(data.error);
            }
            return response;
        }

        async function analyze() {
            const resultDiv = document.getElementById('result');
            resultDiv.style.display = 'block';
            try {
                const data = await (await post('/predict')).json();
                resultDiv.className = 'result ' + data.outcome;
                resultDiv.innerHTML = `
                    <h3>${data.headline}: ${data.outcome}</h3>
                    <p><strong>Confidence:</strong> ${data.confidence}%</p>
                    <p><strong>Next semester forecast:</strong> ${data.forecast.toFixed(2)}</p>
                    ${data.anomaly ? '<p><strong>Anomaly detected:</strong> this profile is unusual for the reference cohort.</p>' : ''}
                    <p>${data.narrative}</p>
                    <p><small>Model: ${data.model}</small></p>`;
            } catch (error) {
                resultDiv.className = 'result error';
                resultDiv.innerHTML = `<p>Error: ${error.message}</p>`;
            }
        }

        async function downloadReport() {
            try {
                const blob = await (await post('/report')).blob();
                const link = document.createElement('a');
                link.href = URL.createObjectURL(blob);
                link.download = 'edu_predict_report.txt';
                link.click();
            } catch (error) {
                const resultDiv = document.getElementById('result');
                resultDiv.style.display = 'block';
                resultDiv.className = 'result error';
                resultDiv.innerHTML = `<p>Error: ${error.message}</p>`;
            }
        }

        (async function loadStatus() {
            const data = await (await fetch('/status')).json();
            document.getElementById('status').textContent = data.ready
                ? `Models ready (${data.dataset_records} reference records)`
                : `SYSTEM ERROR: MODELS NOT LOADED (${data.problem})`;
            const select = document.getElementById('model');
            data.models.forEach(name => {
                const option = document.createElement('option');
                option.textContent = name;
                select.appendChild(option);
            });
        })();
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{AnomalyDetector, Classifier, TrendModel};
    use crate::assembler::FeatureVector;
    use crate::error::ArtifactError;
    use actix_web::{test, App};

    struct Dropout;

    impl Classifier for Dropout {
        fn predict(&self, _: &FeatureVector) -> Result<usize, ArtifactError> {
            Ok(0)
        }
        fn predict_proba(&self, _: &FeatureVector) -> Result<Vec<f64>, ArtifactError> {
            Ok(vec![0.82, 0.1, 0.08])
        }
    }

    struct Normal;

    impl AnomalyDetector for Normal {
        fn predict(&self, _: &FeatureVector) -> Result<i32, ArtifactError> {
            Ok(1)
        }
    }

    struct Flat;

    impl TrendModel for Flat {
        fn predict(&self, inputs: &[f64]) -> Result<f64, ArtifactError> {
            Ok(inputs[0])
        }
    }

    const SAMPLE: &str = "\
Age at enrollment,Gender,Admission grade,Scholarship holder,Tuition fees up to date,Curricular units 1st sem (grade),Curricular units 2nd sem (grade),Unemployment rate,Inflation rate,GDP,Target_Dropout,Target_Enrolled,Target_Graduate
20,1,120.0,0,1,12.0,12.5,10.8,1.4,1.74,0,0,1
23,0,130.0,1,1,13.0,13.5,9.4,-0.8,-3.12,1,0,0
";

    fn dataset() -> ReferenceDataset {
        ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    fn ready_state() -> web::Data<AppState> {
        let registry = ModelRegistry::builder()
            .classifier("Tuned Logistic Regression", Dropout)
            .anomaly(Normal)
            .trend(Flat)
            .build();
        web::Data::new(AppState::from_loaded(Ok(dataset()), Ok(registry)))
    }

    fn degraded_state() -> web::Data<AppState> {
        let registry = ModelRegistry::builder().classifier("Tuned Logistic Regression", Dropout).build();
        web::Data::new(AppState::from_loaded(Ok(dataset()), Ok(registry)))
    }

    #[actix_web::test]
    async fn test_predict_returns_assessment() {
        let app = test::init_service(App::new().app_data(ready_state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "role": "counselor", "age": 22 }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["outcome"], "Dropout");
        assert_eq!(body["confidence"], 82.0);
        assert_eq!(body["anomaly"], false);
        assert_eq!(body["headline"], "RISK ALERT");
        assert_eq!(body["model"], "Tuned Logistic Regression");
    }

    #[actix_web::test]
    async fn test_predict_refused_when_not_ready() {
        let app = test::init_service(App::new().app_data(degraded_state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "role": "student" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_out_of_range_input_is_bad_request() {
        let app = test::init_service(App::new().app_data(ready_state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "role": "student", "age": 90 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_model_is_not_found() {
        let app = test::init_service(App::new().app_data(ready_state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "role": "student", "model": "Tuned XGBoost" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_report_is_an_attachment() {
        let app = test::init_service(App::new().app_data(ready_state()).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/report")
            .set_json(json!({ "role": "teacher" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap().to_string();
        assert!(disposition.contains(REPORT_FILE_NAME));
        let body = test::read_body(resp).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Generated By:       TEACHER"));
        assert!(text.contains("Predicted Outcome:  DROPOUT"));
    }

    #[actix_web::test]
    async fn test_status_reports_missing_models() {
        let app = test::init_service(App::new().app_data(degraded_state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ready"], false);
        assert_eq!(body["dataset_records"], 2);
        assert!(body["problem"].as_str().unwrap().contains("anomaly model"));
    }

    #[actix_web::test]
    async fn test_analytics_served_without_models() {
        let app = test::init_service(App::new().app_data(degraded_state()).configure(configure)).await;
        let req = test::TestRequest::get().uri("/analytics").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_records"], 2);
        assert_eq!(body["high_risk_count"], 1);
    }

    fn no_dataset_state() -> web::Data<AppState> {
        let dataset = ReferenceDataset::from_reader("Age\n20\n".as_bytes());
        assert!(dataset.is_err());
        let registry = ModelRegistry::builder()
            .classifier("Tuned Logistic Regression", Dropout)
            .anomaly(Normal)
            .trend(Flat)
            .build();
        web::Data::new(AppState::from_loaded(dataset, Ok(registry)))
    }

    #[actix_web::test]
    async fn test_missing_dataset_refuses_data_routes() {
        let app = test::init_service(App::new().app_data(no_dataset_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({ "role": "student" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SERVICE_UNAVAILABLE);

        let req = test::TestRequest::get().uri("/analytics").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SERVICE_UNAVAILABLE);

        let req = test::TestRequest::get().uri("/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ready"], false);
        assert!(body["dataset_records"].is_null());
        assert!(body["problem"].as_str().unwrap().contains("dataset"));

        let req = test::TestRequest::get().uri("/health").to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }
}
