//! SELinux context tables (A4), ported from the original tooling's
//! `mpm/contexts/subjects.py` and `mpm/contexts/objects.py`.
//!
//! These are consulted only to resolve `--subject NAME`/`--object NAME`
//! CLI flags into the concrete context strings used to label the FHS
//! rules applied and the accessed paths reported; they never feed back
//! into the generalization engine itself (the engine doesn't know what
//! SELinux is, per the §1 Non-goals).

/// Subject (process) SELinux contexts for one service.
pub const fn subject_contexts(service: &str) -> Option<&'static [&'static str]> {
    match service.as_bytes() {
        b"postgres" => Some(&["system_u:system_r:postgresql_t:s0"]),
        b"sshd" => Some(&["system_u:system_r:sshd_t:s0-s0:c0.c1023"]),
        b"postfix" => Some(&[
            "system_u:system_r:postfix_master_t:s0",
            "system_u:system_r:postfix_pickup_t:s0",
            "system_u:system_r:postfix_qmgr_t:s0",
        ]),
        b"apache" => Some(&["system_u:system_r:httpd_t:s0"]),
        _ => None,
    }
}

/// Object (file) SELinux types for one service.
pub const fn object_types(service: &str) -> Option<&'static [&'static str]> {
    match service.as_bytes() {
        b"postgres" => Some(&[
            "postgresql_etc_t",
            "postgresql_initrc_exec_t",
            "postgresql_exec_t",
            "postgresql_db_t",
            "postgresql_unit_file_t",
            "postgresql_log_t",
            "postgresql_var_run_t",
        ]),
        b"sshd" => Some(&[
            "sshd_exec_t",
            "sshd_key_t",
            "sshd_keygen_exec_t",
            "sshd_keygen_unit_file_t",
            "sshd_unit_file_t",
        ]),
        b"postfix" => Some(&[
            "postfix_bounce_exec_t",
            "postfix_cleanup_exec_t",
            "postfix_data_t",
            "postfix_etc_t",
            "postfix_exec_t",
            "postfix_local_exec_t",
            "postfix_map_exec_t",
            "postfix_master_exec_t",
            "postfix_pickup_exec_t",
            "postfix_pipe_exec_t",
            "postfix_postdrop_exec_t",
            "postfix_postqueue_exec_t",
            "postfix_private_t",
            "postfix_public_t",
            "postfix_qmgr_exec_t",
            "postfix_showq_exec_t",
            "postfix_smtp_exec_t",
            "postfix_smtpd_exec_t",
            "postfix_spool_bounce_t",
            "postfix_spool_t",
            "postfix_virtual_exec_t",
        ]),
        b"apache" => Some(&[
            "httpd_cache_t",
            "httpd_config_t",
            "httpd_exec_t",
            "httpd_log",
            "httpd_modules_t",
            "httpd_rotatelogs_exec",
            "httpd_suexec_exec_t",
            "httpd_sys_content_",
            "httpd_sys_script_exec_t",
            "httpd_unit_file_t",
            "httpd_var_lib_t",
            "httpd_var_run_t",
        ]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_services_resolve() {
        assert_eq!(subject_contexts("sshd"), Some(&["system_u:system_r:sshd_t:s0-s0:c0.c1023"][..]));
        assert!(object_types("postgres").unwrap().contains(&"postgresql_db_t"));
    }

    #[test]
    fn unknown_service_is_none() {
        assert!(subject_contexts("unknown-service").is_none());
        assert!(object_types("unknown-service").is_none());
    }
}
