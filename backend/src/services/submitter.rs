use super::deadline;
use crate::cli::SubmitArgs;
use crate::models::submission_setting::SubmissionSetting;
use anyhow::{bail, Context, Result};
use blender::models::{
    job_info::{JobInfo, MachineList},
    key_value,
    plugin_config::PluginConfig,
};
use blender::submission::{JobSubmission, SubmissionFiles};
use std::path::Path;
use tracing::{info, warn};

/// Turn the remembered settings, updated with the command line, into a job submission.
pub fn build_submission(settings: &SubmissionSetting, args: &SubmitArgs) -> Result<JobSubmission> {
    let Some(scene_file) = settings.scene.clone() else {
        bail!("No Blender file to submit, pass one on the command line");
    };

    let machine_list = match settings.is_blacklist {
        true => MachineList::Blacklist(settings.machine_list.clone()),
        false => MachineList::Whitelist(settings.machine_list.clone()),
    };
    let defaults = JobInfo::default();

    let job = JobInfo {
        name: args
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| JobSubmission::default_name(&scene_file)),
        comment: args.comment.clone().unwrap_or_default(),
        department: settings.department.clone(),
        pool: settings.pool.clone(),
        secondary_pool: settings.secondary_pool.clone(),
        group: settings.group.clone(),
        priority: settings.priority,
        task_timeout_minutes: args.task_timeout.unwrap_or(defaults.task_timeout_minutes),
        enable_auto_timeout: args.auto_timeout,
        concurrent_tasks: args.concurrent_tasks.unwrap_or(defaults.concurrent_tasks),
        limit_concurrent_tasks_to_number_of_cpus: args
            .limit_concurrent_tasks
            .unwrap_or(defaults.limit_concurrent_tasks_to_number_of_cpus),
        machine_limit: settings.machine_limit,
        machine_list,
        limit_groups: settings.limit_groups.clone(),
        job_dependencies: args.dependencies.clone().unwrap_or_default(),
        on_job_complete: args.on_job_complete.unwrap_or_default(),
        submit_suspended: args.suspended,
        frames: settings.frames.clone(),
        chunk_size: settings.chunk_size.max(1),
        output_filename: None,
    };

    Ok(JobSubmission {
        scene_file,
        submit_scene: settings.submit_scene,
        output: settings.output.clone(),
        threads: settings.threads,
        build: settings.build,
        version: args.blender_version.clone(),
        job,
    })
}

fn print_files(files: &SubmissionFiles) -> Result<()> {
    for path in [&files.job_info, &files.plugin_info] {
        let content = std::fs::read(path)
            .and_then(|bytes| key_value::decode(&bytes))
            .with_context(|| format!("Unable to read back {path:?}"))?;
        println!("{}:\n{}", path.display(), content);
    }
    Ok(())
}

/// Validate, write and hand the job to deadline. Settings are only remembered once deadline accepted the job.
pub async fn submit(config: &PluginConfig, config_dir: &Path, args: &SubmitArgs) -> Result<()> {
    let settings_path = SubmissionSetting::get_settings_path(config_dir);
    let mut settings = SubmissionSetting::load(&settings_path);
    settings.apply(args);

    let submission = build_submission(&settings, args)?;
    let warnings = submission.validate()?;
    for warning in &warnings {
        warn!("{warning}");
    }
    if !warnings.is_empty() && !args.yes {
        bail!("Submission cancelled, run again with --yes to submit anyway");
    }

    let files = submission
        .write(&config.temp_dir)
        .with_context(|| format!("Unable to write job files to {:?}", config.temp_dir))?;

    if args.dry_run {
        info!("Dry run, nothing was submitted");
        return print_files(&files);
    }

    let command = deadline::find_deadline_command(config.deadline_command.as_deref());
    info!("Submitting {} to deadline", submission.job.name);
    let output = deadline::submit(&command, &files).await?;
    println!("{output}");

    if let Err(e) = settings.save(&settings_path) {
        warn!("Unable to remember submission settings at {settings_path:?}: {e}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blender::models::{build::Build, job_info::OnJobComplete};
    use std::fs;
    use std::path::PathBuf;

    fn settings() -> SubmissionSetting {
        SubmissionSetting {
            scene: Some(PathBuf::from("/projects/shot_010.blend")),
            frames: "1-100".to_owned(),
            is_blacklist: true,
            machine_list: "node01,node02".to_owned(),
            build: Build::Bit64,
            ..Default::default()
        }
    }

    #[test]
    fn job_name_defaults_to_scene() {
        let submission = build_submission(&settings(), &SubmitArgs::default()).unwrap();
        assert_eq!(submission.job.name, "shot_010");
        assert_eq!(submission.job.frames, "1-100");
        assert_eq!(submission.job.priority, 50);
        assert_eq!(submission.build, Build::Bit64);
        assert_eq!(
            submission.job.machine_list,
            MachineList::Blacklist("node01,node02".to_owned())
        );
    }

    #[test]
    fn per_job_options_come_from_the_command_line() {
        let args = SubmitArgs {
            name: Some("Shot 10 lighting".to_owned()),
            comment: Some("new sky".to_owned()),
            suspended: true,
            on_job_complete: Some(OnJobComplete::Archive),
            concurrent_tasks: Some(4),
            blender_version: Some("4.1".to_owned()),
            ..Default::default()
        };
        let submission = build_submission(&settings(), &args).unwrap();
        assert_eq!(submission.job.name, "Shot 10 lighting");
        assert_eq!(submission.job.comment, "new sky");
        assert!(submission.job.submit_suspended);
        assert_eq!(submission.job.on_job_complete, OnJobComplete::Archive);
        assert_eq!(submission.job.concurrent_tasks, 4);
        assert_eq!(submission.version.as_deref(), Some("4.1"));
    }

    #[test]
    fn scene_is_required() {
        let settings = SubmissionSetting::default();
        assert!(build_submission(&settings, &SubmitArgs::default()).is_err());
    }

    #[tokio::test]
    async fn dry_run_writes_files_and_remembers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("shot.blend");
        fs::write(&scene, b"BLENDER").unwrap();

        let config = PluginConfig {
            temp_dir: dir.path().join("temp"),
            ..Default::default()
        };
        let args = SubmitArgs {
            scene: Some(scene),
            frames: Some("1-10".to_owned()),
            submit_scene: Some(true),
            dry_run: true,
            ..Default::default()
        };

        submit(&config, dir.path(), &args).await.unwrap();

        let job = key_value::read(config.temp_dir.join("blender_job_info.job")).unwrap();
        assert_eq!(job["Name"], "shot");
        assert_eq!(job["Frames"], "1-10");
        assert!(config.temp_dir.join("blender_plugin_info.job").is_file());
        assert!(!SubmissionSetting::get_settings_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn local_paths_need_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("shot.blend");
        fs::write(&scene, b"BLENDER").unwrap();

        let config = PluginConfig {
            temp_dir: dir.path().join("temp"),
            ..Default::default()
        };
        let args = SubmitArgs {
            scene: Some(scene),
            frames: Some("1-10".to_owned()),
            submit_scene: Some(false),
            dry_run: true,
            ..Default::default()
        };

        assert!(submit(&config, dir.path(), &args).await.is_err());
        assert!(!config.temp_dir.exists());

        let args = SubmitArgs { yes: true, ..args };
        assert!(submit(&config, dir.path(), &args).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn accepted_submission_is_remembered() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let scene = dir.path().join("shot.blend");
        fs::write(&scene, b"BLENDER").unwrap();
        let command = dir.path().join("deadlinecommand");
        fs::write(&command, "#!/bin/sh\necho \"Result=Success\"\n").unwrap();
        fs::set_permissions(&command, fs::Permissions::from_mode(0o755)).unwrap();

        let config = PluginConfig {
            temp_dir: dir.path().join("temp"),
            deadline_command: Some(command),
            ..Default::default()
        };
        let args = SubmitArgs {
            scene: Some(scene.clone()),
            frames: Some("1-10".to_owned()),
            pool: Some("gpu".to_owned()),
            submit_scene: Some(true),
            ..Default::default()
        };

        submit(&config, dir.path(), &args).await.unwrap();

        let remembered =
            SubmissionSetting::load(&SubmissionSetting::get_settings_path(dir.path()));
        assert_eq!(remembered.scene, Some(scene));
        assert_eq!(remembered.pool, "gpu");
        assert_eq!(remembered.frames, "1-10");
    }
}
