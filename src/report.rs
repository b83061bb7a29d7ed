use chrono::NaiveDateTime;

use crate::model::{round2, Gender, PredictionResult, StudentProfile};

pub const SYSTEM_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const REPORT_FILE_NAME: &str = "edu_predict_report.txt";

const RULE: &str = "=============================================================";
const SECTION: &str = "-------------------------------------------------------------";

/// Whole numbers keep a trailing `.0` so slider values read as decimals.
fn decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn yes_no(yes: bool) -> &'static str {
    if yes {
        "Yes"
    } else {
        "No"
    }
}

/// Plain-text export of one prediction.
pub fn render(result: &PredictionResult, profile: &StudentProfile, role: &str, at: NaiveDateTime) -> String {
    let gender = match profile.gender {
        Gender::Male => "Male",
        Gender::Female => "Female",
    };
    let tuition = if profile.tuition_paid.is_yes() { "Paid" } else { "Unpaid" };

    let mut out = String::new();
    let mut line = |text: &str| {
        out.push_str(text);
        out.push('\n');
    };

    line(RULE);
    line("       🎓 EDUPREDICT | ACADEMIC INTELLIGENCE REPORT");
    line(RULE);
    line("");
    line("[REPORT METADATA]");
    line(SECTION);
    line(&format!("Generated By:       {}", role.to_uppercase()));
    line(&format!("Date:               {}", at.format("%Y-%m-%d")));
    line(&format!("Time:               {}", at.format("%H:%M:%S")));
    line(&format!("System Version:     v{SYSTEM_VERSION}"));
    line("");
    line("[STUDENT PROFILE]");
    line(SECTION);
    line(&format!("Age at Enrollment:  {:.0}", profile.age.round_ties_even()));
    line(&format!("Admission Grade:    {}", decimal(profile.admission_grade)));
    line(&format!("Gender:             {gender}"));
    line(&format!("Scholarship:        {}", yes_no(profile.scholarship.is_yes())));
    line(&format!("Tuition Status:     {tuition}"));
    line(&format!("Sem 1 Grade:        {}", decimal(profile.sem1_grade)));
    line(&format!("Sem 2 Grade:        {}", decimal(profile.sem2_grade)));
    line("");
    line("[ECONOMIC CONTEXT]");
    line(SECTION);
    line(&format!("Unemployment Rate:  {}%", decimal(profile.unemployment)));
    line(&format!("Inflation Rate:     {}%", decimal(profile.inflation)));
    line(&format!("GDP Index:          {}", decimal(profile.gdp)));
    line("");
    line("[ANALYSIS RESULTS]");
    line(SECTION);
    line(&format!("Predicted Outcome:  {}", result.outcome.label().to_uppercase()));
    line(&format!("Confidence Score:   {}%", decimal(result.confidence)));
    line(&format!("Anomaly Detected:   {}", if result.anomaly { "YES" } else { "NO" }));
    line(&format!("Next Sem Forecast:  {} (Estimated)", decimal(round2(result.forecast))));
    line("");
    line("[INTERVENTION NOTE]");
    line(SECTION);
    line("This report is generated by an AI model. The predictions");
    line("are advisory. Please consult with academic counselors for");
    line("authorized support plans.");
    line("");
    line(RULE);
    line("© 2024 EduPredict Systems. All Rights Reserved.");
    line(RULE);
    out
}
