mod overdue_job;
