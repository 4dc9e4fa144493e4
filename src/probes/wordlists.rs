/// Common subdomain prefixes, most likely first.
pub const SUBDOMAIN_PREFIXES: &[&str] = &[
    "www", "mail", "ftp", "webmail", "smtp", "pop", "ns1", "ns2", "vpn", "api",
    "dev", "staging", "test", "admin", "portal", "remote", "blog", "shop", "m", "mobile",
    "app", "apps", "cdn", "static", "assets", "img", "images", "media", "docs", "support",
    "help", "status", "git", "gitlab", "jenkins", "ci", "jira", "confluence", "wiki", "intranet",
    "internal", "extranet", "secure", "login", "auth", "sso", "id", "accounts", "billing", "pay",
    "payments", "store", "crm", "erp", "hr", "exchange", "owa", "autodiscover", "mx", "mx1",
    "mx2", "imap", "pop3", "ns", "ns3", "dns", "dns1", "dns2", "gateway", "proxy",
    "firewall", "fw", "router", "monitor", "monitoring", "grafana", "kibana", "elastic", "logs", "metrics",
    "db", "database", "mysql", "sql", "redis", "mongo", "backup", "backups", "files", "download",
    "downloads", "upload", "uploads", "demo", "beta", "alpha", "preprod", "uat", "qa", "sandbox",
    "stage", "prod", "production", "old", "new", "legacy", "v1", "v2", "api2", "graphql",
    "ws", "socket", "chat", "forum", "community", "news", "events", "careers", "jobs", "partners",
    "cloud", "s3", "storage", "vault", "office", "citrix", "rdp", "ts", "terminal", "cpanel",
    "whm", "plesk", "webdisk", "dashboard", "panel", "manage", "management", "console", "registry", "docker",
];

/// Paths checked by the directory scanner.
pub const DIRECTORY_PATHS: &[&str] = &[
    "admin", "administrator", "login", "wp-admin", "wp-login.php", "dashboard", "cpanel", "phpmyadmin", "admin.php", "user/login",
    ".git/HEAD", ".git/config", ".env", ".env.local", ".env.production", ".htaccess", ".htpasswd", ".svn/entries", ".DS_Store", ".well-known/security.txt",
    "config.php", "config.json", "config.yml", "configuration.php", "settings.py", "web.config", "app.config", "database.yml", "wp-config.php", "wp-config.php.bak",
    "backup", "backups", "backup.zip", "backup.tar.gz", "backup.sql", "db.sql", "dump.sql", "database.sql", "site.zip", "old",
    "api", "api/v1", "api/v2", "graphql", "swagger", "swagger.json", "swagger-ui.html", "openapi.json", "api-docs", "v2/api-docs",
    "server-status", "server-info", "phpinfo.php", "info.php", "status", "health", "metrics", "actuator", "actuator/health", "actuator/env",
    "console", "debug", "trace", "test", "tests", "dev", "staging", "tmp", "temp", "logs",
    "log", "error.log", "access.log", "debug.log", "uploads", "upload", "files", "static", "assets", "private",
    "robots.txt", "sitemap.xml", "crossdomain.xml", "readme.html", "README.md", "CHANGELOG.md", "LICENSE", "composer.json", "package.json", "yarn.lock",
    "jenkins", "gitlab", "grafana", "kibana", "solr", "manager/html", "jmx-console", "web-console", "hudson", "elmah.axd",
    "auth", "oauth", "signin", "signup", "register", "account", "profile", "portal", "webmail", "owa",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_wordlists_have_no_duplicates() {
        let subs: HashSet<_> = SUBDOMAIN_PREFIXES.iter().collect();
        assert_eq!(subs.len(), SUBDOMAIN_PREFIXES.len());
        let paths: HashSet<_> = DIRECTORY_PATHS.iter().collect();
        assert_eq!(paths.len(), DIRECTORY_PATHS.len());
    }

    #[test]
    fn test_directory_list_exceeds_ceiling() {
        assert!(DIRECTORY_PATHS.len() > 100);
    }
}
