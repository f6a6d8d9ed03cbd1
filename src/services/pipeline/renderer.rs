//! Notification Rendering
//!
//! Turns a recipient bundle into the complete notification document:
//! salutation, duty table, fixed operational instructions, signature.
//! Rendering is pure: same bundle in, same document out, no I/O.

use crate::models::{NotificationDocument, RecipientBundle};

const SUBJECT: &str = "Invigilation Duties - Minor-1 2025-26";
const SEMESTER: &str = "Spring Semester Minor-1 2025-26";
const CONTACT_ADDRESS: &str = "murtaza.bohra@mahindrauniversity.edu.in";
const TEXT_FALLBACK: &str = "Please view this email in HTML format.";

/// Operational instructions included verbatim in every notification.
const INSTRUCTIONS: [&str; 7] = [
    "All invigilators are expected to report to the allotted exam room at least 20 minutes before start of the exam for smooth operation of the QP collection/distribution.",
    "Request all faculty/Non-faculty colleagues to please observe the \u{201c}NO CELL PHONE/LAPTOP\u{201d} usage during the duty period.",
    "The question papers will be distributed exactly at 10:00 AM. Please ensure that all students are expected to be seated in their designated places by 9:50 AM \u{2013} however, we estimate that few students will enter post this time \u{2013} and hence NO students will be allowed to enter the exam room after 10:00 AM under any circumstances.",
    "The students are required to report to the examination centers at Mahindra University with their MU identity card (ID) at 9.30 AM onward. In the event of a lost ID card or if a student is not carrying their ID card, they will be liable for a penalty of Rs. 5000/-, which can only be paid through the QR code (using PhonePe, G Pay, Paytm, etc.) available at the check-in desk for obtaining a new or temporary ID card.",
    "Cell phones, smartwatches, notes, papers, and bags are strictly prohibited in the examination hall. Students need to bring their own pens, pencils, scientific (non-programmable) calculator, ruler, and erasers; borrowing from other students will not be allowed. If any student is found carrying any banned item during the examination, their exam paper will be immediately confiscated and awarded \u{2018}ZERO MARK\u{2019}. There will be random physical frisking in each exam room.",
    "Students will be permitted to leave the exam room only after completing the first one hour.",
    "No wash room break for Minors and supplementary exams!",
];

/// Render the notification for one recipient bundle.
pub fn render(bundle: &RecipientBundle) -> NotificationDocument {
    let recipient = &bundle.recipient;

    let mut rows = String::new();
    for duty in &bundle.duties {
        rows.push_str(&format!(
            "        <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            duty.date,
            duty.time,
            duty.venue.as_deref().unwrap_or(""),
            duty.hall.as_deref().unwrap_or(""),
            duty.floor.as_deref().unwrap_or(""),
        ));
    }

    let mut instructions = String::new();
    for (number, text) in INSTRUCTIONS.iter().enumerate() {
        instructions.push_str(&format!(
            "    <p><strong>{}. {}</strong></p>\n",
            number + 1,
            text
        ));
    }

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
    <p>Dear <strong>{name}</strong> ({label}: {value}),</p>
    <p>You are assigned the following invigilation duties for <strong>{semester}</strong>:</p>
    <table border="1" cellpadding="8" cellspacing="0" style="border-collapse:collapse;width:100%; margin: 20px 0;">
      <thead style="background:#4CAF50; color: white;">
        <tr>
          <th>Date</th>
          <th>Time</th>
          <th>Venue</th>
          <th>Hall</th>
          <th>Floor</th>
        </tr>
      </thead>
      <tbody>
{rows}      </tbody>
    </table>
    <p><strong>Instructions:</strong></p>
{instructions}
    <p><em>This is a noreply email. For any queries please contact: <a href="mailto:{contact}">{contact}</a></em></p>
    <p>Thank you for your cooperation.</p>
    <div style="margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee;">
      <p><strong>Warm Regards,</strong></p>
      <p><strong>Prof. Murtaza Bohra</strong><br>
      Controller of Examinations<br>
      <strong>Mahindra University, Hyderabad</strong></p>
    </div>
</div>"#,
        name = recipient.name,
        label = recipient.external_id.label,
        value = recipient.external_id.value,
        semester = SEMESTER,
        rows = rows,
        instructions = instructions,
        contact = CONTACT_ADDRESS,
    );

    NotificationDocument {
        subject: SUBJECT.to_string(),
        html_body,
        text_body: TEXT_FALLBACK.to_string(),
    }
}
