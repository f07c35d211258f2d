use serde::Serialize;

use crate::models::{RiskScores, SurveyAnswers};

/// Personalized guidance grouped the way the frontend renders it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Recommendations {
    pub wellness_tips: Vec<String>,
    pub app_lock_suggestions: Vec<String>,
    pub meditation_exercises: Vec<String>,
    pub parental_controls: Vec<String>,
}

pub fn generate(answers: &SurveyAnswers, scores: &RiskScores) -> Recommendations {
    let mut recs = Recommendations::default();
    push_wellness_tips(answers, &mut recs.wellness_tips);
    push_app_lock_suggestions(answers, &mut recs.app_lock_suggestions);
    push_work_screen_tips(answers, &mut recs.wellness_tips);
    push_mindfulness_plan(answers, &mut recs.meditation_exercises);
    push_accountability(answers, scores.total_risk, &mut recs.parental_controls);
    recs
}

fn push_wellness_tips(answers: &SurveyAnswers, tips: &mut Vec<String>) {
    match answers.total_screen_time.as_str() {
        "More than 6 hours" => tips.extend([
            "Your daily screen time is above six hours, which is excessive and harmful".to_string(),
            "Take a 10-minute break for every 30 minutes of screen use".to_string(),
            "Practice the 20-20-20 rule: every 20 minutes look 20 feet away for 20 seconds"
                .to_string(),
            "Create device-free zones such as the bedroom and dining table".to_string(),
            "Switch your phone to grayscale after 6 PM".to_string(),
            "Target reducing screen time by two hours this week".to_string(),
        ]),
        "5–6 hours" => tips.extend([
            "Five to six hours of daily screen time is above healthy limits".to_string(),
            "Take five-minute breaks every hour".to_string(),
            "Practice the 20-20-20 rule for eye health".to_string(),
            "Establish device-free zones at home".to_string(),
            "Try a digital sunset: no screens in the last hour before bed".to_string(),
            "Aim for under four hours daily".to_string(),
        ]),
        "3–4 hours" => tips.extend([
            "Your screen time is moderate but has room to improve".to_string(),
            "Keep taking hourly breaks".to_string(),
            "Use blue light filters in the evening".to_string(),
            "Track your usage to maintain awareness".to_string(),
            "Aim to stay under four hours".to_string(),
        ]),
        "1–2 hours" => tips.extend([
            "Your screen time is within healthy limits".to_string(),
            "Keep maintaining these habits".to_string(),
            "Keep tracking to stay accountable".to_string(),
            "Consider sharing your strategies with others".to_string(),
        ]),
        _ => tips.extend([
            "Your screen time is exceptionally healthy".to_string(),
            "You are a role model for digital wellness".to_string(),
            "Consider mentoring others on healthy tech habits".to_string(),
            "Maintain this balance".to_string(),
        ]),
    }

    if answers.stress >= 4 {
        tips.insert(
            1,
            format!(
                "High stress level ({}/5) reported; screen breaks matter for recovery",
                answers.stress
            ),
        );
    }

    if matches!(answers.screen_before_sleep.as_str(), "Always" | "Often") {
        tips.push(
            "Screens right before sleep are harming your rest; stop at least an hour before bed"
                .to_string(),
        );
    }
}

fn push_app_lock_suggestions(answers: &SurveyAnswers, suggestions: &mut Vec<String>) {
    match answers.social_media.as_str() {
        "More than 6 hours" => suggestions.extend([
            "Six or more hours on social media is a serious mental health risk".to_string(),
            "Set a one-hour daily limit across all social apps".to_string(),
            "Block social apps entirely once the limit is reached".to_string(),
            "Force grayscale mode on your phone".to_string(),
            "Consider deleting social apps for a one-week detox".to_string(),
            "Allow access only in a fixed midday window".to_string(),
        ]),
        "5–6 hours" => suggestions.extend([
            "Five to six hours on social media is excessive".to_string(),
            "Set a strict two-hour daily limit on social apps".to_string(),
            "Enable per-app timers of 30 minutes each".to_string(),
            "Switch to grayscale after 8 PM".to_string(),
            "Disable all social media notifications".to_string(),
            "Schedule fixed usage windows instead of open-ended scrolling".to_string(),
        ]),
        "3–4 hours" => suggestions.extend([
            "Three to four hours on social media is above healthy limits".to_string(),
            "Reduce to two hours daily using app timers".to_string(),
            "Turn off non-essential notifications".to_string(),
            "Use grayscale mode after 9 PM".to_string(),
            "Set a 90-minute daily limit this week".to_string(),
        ]),
        "1–2 hours" => suggestions.extend([
            "One to two hours of social media is reasonable".to_string(),
            "Maintain the current limits".to_string(),
            "Consider reducing to under an hour".to_string(),
            "Keep notifications minimal".to_string(),
        ]),
        _ => suggestions.extend([
            "Your social media usage is exemplary".to_string(),
            "You have built solid digital discipline".to_string(),
            "Share your strategies with others who struggle".to_string(),
            "Maintain this boundary".to_string(),
        ]),
    }

    match answers.entertainment.as_str() {
        "More than 6 hours" | "5–6 hours" => suggestions.insert(
            1,
            format!(
                "Entertainment time ({}) is excessive; set a two-hour daily limit",
                answers.entertainment
            ),
        ),
        "3–4 hours" => suggestions.push(format!(
            "Entertainment time ({}) can come down; try two hours max",
            answers.entertainment
        )),
        _ => {}
    }
}

fn push_work_screen_tips(answers: &SurveyAnswers, tips: &mut Vec<String>) {
    match answers.work_time.as_str() {
        "More than 6 hours" | "5–6 hours" => tips.extend([
            "Long work screen hours make ergonomics important".to_string(),
            "Check your chair and desk setup".to_string(),
            "Use the Pomodoro technique: 25 minutes on, five off".to_string(),
            "The 20-20-20 rule matters even more during long work blocks".to_string(),
        ]),
        "3–4 hours" => {
            tips.push("Moderate work screen time; keep an eye on posture".to_string());
        }
        _ => {}
    }
}

fn push_mindfulness_plan(answers: &SurveyAnswers, plan: &mut Vec<String>) {
    if answers.stress >= 4 || answers.anxious >= 4 {
        plan.extend([
            format!(
                "Daily 15-minute guided meditation (stress {}/5, anxiety {}/5)",
                answers.stress, answers.anxious
            ),
            "Box breathing four times a day: four seconds in, hold, out, hold".to_string(),
            "A 30-minute evening yoga or stretching session for stress relief".to_string(),
            "Two 20-minute outdoor walks without your phone".to_string(),
            "Progressive muscle relaxation before bed".to_string(),
            "A five-minute worry journal each evening".to_string(),
        ]);
    } else if answers.stress >= 3 || answers.anxious >= 3 {
        plan.extend([
            format!(
                "A daily 10-minute meditation is recommended (stress {}/5, anxiety {}/5)",
                answers.stress, answers.anxious
            ),
            "Box breathing during stressful moments".to_string(),
            "A 15-minute evening yoga or stretching routine".to_string(),
            "A daily 20-minute mindful walk without devices".to_string(),
            "Progressive muscle relaxation a few times per week".to_string(),
        ]);
    } else {
        plan.extend([
            format!(
                "Stress ({}/5) and anxiety ({}/5) are in a healthy range",
                answers.stress, answers.anxious
            ),
            "Continue your current wellness routine".to_string(),
            "Explore new meditation techniques for variety".to_string(),
            "Consider deepening your mindfulness practice".to_string(),
        ]);
    }

    if answers.sleep_quality <= 2 {
        plan.insert(
            0,
            format!(
                "Sleep quality ({}/5) is very poor; try bedtime yoga or a sleep meditation",
                answers.sleep_quality
            ),
        );
    } else if answers.sleep_quality == 3 {
        plan.push(format!(
            "Sleep quality ({}/5) has room to improve; wind down without screens",
            answers.sleep_quality
        ));
    }

    match answers.exercise.as_str() {
        "Never" => plan.extend([
            "No exercise at all compounds screen-related stress".to_string(),
            "Start today with a 20-minute walk".to_string(),
            "Build toward exercising three to four days per week".to_string(),
            "Even ten minutes daily makes a difference".to_string(),
        ]),
        "1–2 days per week" => plan.insert(
            2,
            "Good start; increase to three or four days per week for the full benefit".to_string(),
        ),
        "3–4 days per week" => {
            plan.push("Solid exercise routine; keep three to four days per week going".to_string());
        }
        _ => plan.push("Daily exercise is optimal for mental health; keep it up".to_string()),
    }

    if answers.eye_strain >= 4 {
        plan.insert(
            0,
            format!(
                "Severe eye strain ({}/5); take immediate breaks and reduce brightness",
                answers.eye_strain
            ),
        );
    } else if answers.eye_strain >= 3 {
        plan.push(format!(
            "Eye strain ({}/5) is building; increase breaks and adjust lighting",
            answers.eye_strain
        ));
    }
}

fn push_accountability(answers: &SurveyAnswers, total_risk: f64, controls: &mut Vec<String>) {
    match answers.addicted.as_str() {
        "Yes" => controls.extend([
            "You identified a device addiction, which deserves immediate action".to_string(),
            "Find an accountability partner for daily check-ins".to_string(),
            "Consider speaking with a therapist about screen addiction".to_string(),
            "Use aggressive blocking apps that lock everything during focus time".to_string(),
            "Join a digital detox support community".to_string(),
            "Share your screen time with someone you trust every day".to_string(),
            "Try a 30-day challenge to cut screen time in half".to_string(),
        ]),
        "Maybe" => controls.extend([
            "You suspect device addiction; take it seriously before it worsens".to_string(),
            "Find an accountability partner for weekly check-ins".to_string(),
            "Try focus apps that block distracting sites".to_string(),
            "Join a digital wellness community".to_string(),
            "Track daily and review progress weekly".to_string(),
        ]),
        "Not sure" => controls.extend([
            "Unsure about addiction? Monitor your usage honestly for two weeks".to_string(),
            "Track everything and assess the pattern".to_string(),
            "Consider an accountability buddy".to_string(),
        ]),
        _ => controls.extend([
            "Good awareness; you do not feel addicted".to_string(),
            "Keep monitoring to stay that way".to_string(),
            "Help others who struggle with screen addiction".to_string(),
        ]),
    }

    match answers.age_group.as_deref() {
        Some("18–24") => controls.extend([
            "Build peer accountability and share goals with friends".to_string(),
            "Swap some social media time for career skill-building".to_string(),
            "Your age group reports the heaviest usage, so stay vigilant".to_string(),
        ]),
        Some("25–34") => controls.extend([
            "Prioritize screen time that advances your career over feeds".to_string(),
            "Create accountability groups with colleagues or friends".to_string(),
            "Track how screen habits affect your productivity".to_string(),
        ]),
        Some("35–44") | Some("45–54") => controls.extend([
            "Model healthy behavior; your kids copy what they see".to_string(),
            "Enforce device-free family meals".to_string(),
            "Use platform family controls for children's devices".to_string(),
            "Write a family media agreement together".to_string(),
        ]),
        Some("55+") => controls.extend([
            "Set the example for younger family members".to_string(),
            "Use screens for learning and meaningful connection".to_string(),
            "Balance technology with face-to-face time".to_string(),
        ]),
        _ => {}
    }

    if total_risk > 70.0 {
        controls.insert(
            0,
            format!(
                "Critical risk ({}/100): seek professional support now",
                total_risk as i64
            ),
        );
    } else if total_risk > 60.0 {
        controls.insert(
            0,
            format!(
                "High risk ({}/100): intervene this week and get support",
                total_risk as i64
            ),
        );
    } else if total_risk > 50.0 {
        controls.insert(
            0,
            format!(
                "Elevated risk ({}/100): start with an accountability partner",
                total_risk as i64
            ),
        );
    }
}
