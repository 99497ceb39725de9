//! corosync.conf template.

use hacluster_common::Transport;
use std::fmt;

use super::context::CorosyncContext;

/// Fixed totem tuning
const TOTEM_DEFAULTS: &[(&str, &str)] = &[
    ("version", "2"),
    ("token", "3000"),
    ("token_retransmits_before_loss_const", "10"),
    ("join", "60"),
    ("consensus", "3600"),
    ("max_messages", "20"),
    ("clear_node_high_bit", "yes"),
    ("threads", "0"),
];

/// Render the full configuration file. Output depends only on `ctx`.
pub fn render_config(ctx: &CorosyncContext) -> String {
    CorosyncConf(ctx).to_string()
}

struct CorosyncConf<'a>(&'a CorosyncContext);

impl fmt::Display for CorosyncConf<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.0;
        let debug = if ctx.debug { "on" } else { "off" };

        writeln!(f, "# Config file generated by the hacluster charm.")?;
        writeln!(f)?;

        writeln!(f, "totem {{")?;
        for (key, value) in TOTEM_DEFAULTS {
            writeln!(f, "    {}: {}", key, value)?;
        }
        writeln!(f, "    ip_version: {}", ctx.membership.family().ip_version())?;
        writeln!(f, "    transport: {}", ctx.transport)?;
        if let Some(id) = ctx.local_node_id {
            writeln!(f, "    nodeid: {}", id)?;
        }
        if let Some(multicast) = &ctx.multicast {
            writeln!(f, "    interface {{")?;
            writeln!(f, "        ringnumber: 0")?;
            if let Some(bindnetaddr) = multicast.bindnetaddr {
                writeln!(f, "        bindnetaddr: {}", bindnetaddr)?;
            }
            writeln!(f, "        mcastaddr: {}", multicast.mcastaddr)?;
            writeln!(f, "        mcastport: {}", multicast.mcastport)?;
            writeln!(f, "    }}")?;
        }
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(f, "quorum {{")?;
        writeln!(f, "    provider: corosync_votequorum")?;
        if ctx.transport == Transport::Udpu && ctx.membership.len() == 2 {
            writeln!(f, "    two_node: 1")?;
        }
        writeln!(f, "}}")?;
        writeln!(f)?;

        if ctx.transport == Transport::Udpu {
            writeln!(f, "nodelist {{")?;
            for (id, addr) in ctx.membership.iter() {
                writeln!(f, "    node {{")?;
                writeln!(f, "        ring0_addr: {}", addr)?;
                writeln!(f, "        nodeid: {}", id)?;
                writeln!(f, "    }}")?;
            }
            writeln!(f, "}}")?;
            writeln!(f)?;
        }

        writeln!(f, "logging {{")?;
        writeln!(f, "    fileline: off")?;
        writeln!(f, "    to_stderr: yes")?;
        writeln!(f, "    to_logfile: no")?;
        writeln!(f, "    to_syslog: yes")?;
        writeln!(f, "    syslog_facility: daemon")?;
        writeln!(f, "    debug: {}", debug)?;
        writeln!(f, "    logger_subsys {{")?;
        writeln!(f, "        subsys: QUORUM")?;
        writeln!(f, "        debug: {}", debug)?;
        writeln!(f, "    }}")?;
        writeln!(f, "}}")
    }
}
