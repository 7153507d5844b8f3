//! Minimal HTML pages rendered at the end of the OAuth redirect dance.

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn callback_success(store_id: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Connected</title></head>\
         <body style=\"font-family:system-ui;margin:4rem auto;max-width:32rem;text-align:center\">\
         <h1>&#10003; Account connected</h1>\
         <p>Store <strong>{}</strong> is now linked. Daily metrics will start\
         appearing after the next scheduled sync.</p>\
         <p>You can close this window.</p>\
         </body></html>",
        escape(store_id)
    )
}

pub fn callback_error(code: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Connection failed</title></head>\
         <body style=\"font-family:system-ui;margin:4rem auto;max-width:32rem;text-align:center\">\
         <h1>Connection failed</h1>\
         <p><code>{}</code></p>\
         <p>{}</p>\
         <p>Close this window and start the connection again from the dashboard.</p>\
         </body></html>",
        escape(code),
        escape(message)
    )
}
