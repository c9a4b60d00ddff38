use serde::Serialize;

/// A well-known relay preset for pre-filling the account form. Static data,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Provider {
    pub name: &'static str,
    pub host: &'static str,
    pub port: u16,
    pub secure: bool,
}

pub const PROVIDERS: &[Provider] = &[
    Provider {
        name: "Gmail",
        host: "smtp.gmail.com",
        port: 465,
        secure: true,
    },
    Provider {
        name: "Outlook",
        host: "smtp-mail.outlook.com",
        port: 587,
        secure: false,
    },
    Provider {
        name: "Office 365",
        host: "smtp.office365.com",
        port: 587,
        secure: false,
    },
    Provider {
        name: "Yahoo",
        host: "smtp.mail.yahoo.com",
        port: 465,
        secure: true,
    },
    Provider {
        name: "iCloud",
        host: "smtp.mail.me.com",
        port: 587,
        secure: false,
    },
    Provider {
        name: "Zoho",
        host: "smtp.zoho.com",
        port: 465,
        secure: true,
    },
    Provider {
        name: "Fastmail",
        host: "smtp.fastmail.com",
        port: 465,
        secure: true,
    },
];
